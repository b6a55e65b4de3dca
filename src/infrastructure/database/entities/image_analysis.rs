// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum SeaProbableCause {
    #[sea_orm(string_value = "network_error")]
    NetworkError,
    #[sea_orm(string_value = "authentication_error")]
    AuthenticationError,
    #[sea_orm(string_value = "permission_denied")]
    PermissionDenied,
    #[sea_orm(string_value = "timeout")]
    Timeout,
    #[sea_orm(string_value = "not_found")]
    NotFound,
    #[sea_orm(string_value = "rate_limit")]
    RateLimit,
    #[sea_orm(string_value = "invalid_input")]
    InvalidInput,
    #[sea_orm(string_value = "server_error")]
    ServerError,
    #[sea_orm(string_value = "dependency_down")]
    DependencyDown,
    #[sea_orm(string_value = "unknown")]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum SeaSeverity {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum SeaAnalysisStatus {
    #[sea_orm(string_value = "ok")]
    Ok,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image_analyses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub analysis_id: Uuid,
    pub error_title: String,
    pub error_code: Option<String>,
    pub product: Option<String>,
    pub environment: Option<JsonValue>,
    pub key_text_blocks: JsonValue,
    pub probable_cause: SeaProbableCause,
    pub suggested_fix: String,
    pub severity: SeaSeverity,
    pub confidence: f64,
    pub follow_up_questions: JsonValue,
    pub status: SeaAnalysisStatus,
    pub image_filename: String,
    pub image_size_bytes: i64,
    pub requester_ip: String,
    pub user_agent: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
