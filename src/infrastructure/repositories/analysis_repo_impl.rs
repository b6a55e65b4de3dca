// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::analysis::{
    AnalysisRecord, AnalysisStatus, ImageMetadata, KeyTextBlock, ProbableCause, Severity,
};
use crate::domain::repositories::analysis_repository::{AnalysisRepository, RepositoryError};
use crate::infrastructure::database::entities::image_analysis::{
    self, SeaAnalysisStatus, SeaProbableCause, SeaSeverity,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;
use serde_json::Value;
use std::sync::Arc;

/// 分析记录仓库实现
#[derive(Clone)]
pub struct AnalysisRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl AnalysisRepositoryImpl {
    /// 创建新的分析记录仓库实现
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<ProbableCause> for SeaProbableCause {
    fn from(cause: ProbableCause) -> Self {
        match cause {
            ProbableCause::NetworkError => SeaProbableCause::NetworkError,
            ProbableCause::AuthenticationError => SeaProbableCause::AuthenticationError,
            ProbableCause::PermissionDenied => SeaProbableCause::PermissionDenied,
            ProbableCause::Timeout => SeaProbableCause::Timeout,
            ProbableCause::NotFound => SeaProbableCause::NotFound,
            ProbableCause::RateLimit => SeaProbableCause::RateLimit,
            ProbableCause::InvalidInput => SeaProbableCause::InvalidInput,
            ProbableCause::ServerError => SeaProbableCause::ServerError,
            ProbableCause::DependencyDown => SeaProbableCause::DependencyDown,
            ProbableCause::Unknown => SeaProbableCause::Unknown,
        }
    }
}

impl From<SeaProbableCause> for ProbableCause {
    fn from(cause: SeaProbableCause) -> Self {
        match cause {
            SeaProbableCause::NetworkError => ProbableCause::NetworkError,
            SeaProbableCause::AuthenticationError => ProbableCause::AuthenticationError,
            SeaProbableCause::PermissionDenied => ProbableCause::PermissionDenied,
            SeaProbableCause::Timeout => ProbableCause::Timeout,
            SeaProbableCause::NotFound => ProbableCause::NotFound,
            SeaProbableCause::RateLimit => ProbableCause::RateLimit,
            SeaProbableCause::InvalidInput => ProbableCause::InvalidInput,
            SeaProbableCause::ServerError => ProbableCause::ServerError,
            SeaProbableCause::DependencyDown => ProbableCause::DependencyDown,
            SeaProbableCause::Unknown => ProbableCause::Unknown,
        }
    }
}

impl From<Severity> for SeaSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => SeaSeverity::Low,
            Severity::Medium => SeaSeverity::Medium,
            Severity::High => SeaSeverity::High,
        }
    }
}

impl From<SeaSeverity> for Severity {
    fn from(severity: SeaSeverity) -> Self {
        match severity {
            SeaSeverity::Low => Severity::Low,
            SeaSeverity::Medium => Severity::Medium,
            SeaSeverity::High => Severity::High,
        }
    }
}

impl From<AnalysisStatus> for SeaAnalysisStatus {
    fn from(status: AnalysisStatus) -> Self {
        match status {
            AnalysisStatus::Ok => SeaAnalysisStatus::Ok,
            AnalysisStatus::Failed => SeaAnalysisStatus::Failed,
        }
    }
}

impl From<SeaAnalysisStatus> for AnalysisStatus {
    fn from(status: SeaAnalysisStatus) -> Self {
        match status {
            SeaAnalysisStatus::Ok => AnalysisStatus::Ok,
            SeaAnalysisStatus::Failed => AnalysisStatus::Failed,
        }
    }
}

#[async_trait]
impl AnalysisRepository for AnalysisRepositoryImpl {
    async fn create(
        &self,
        record: &AnalysisRecord,
        metadata: &ImageMetadata,
    ) -> Result<AnalysisRecord, RepositoryError> {
        let created_at = Utc::now();

        let active_model = image_analysis::ActiveModel {
            analysis_id: Set(record.analysis_id),
            error_title: Set(record.error_title.clone()),
            error_code: Set(record.error_code.clone()),
            product: Set(record.product.clone()),
            environment: Set(record.environment.clone().map(Value::Object)),
            key_text_blocks: Set(to_json(record, &record.key_text_blocks)?),
            probable_cause: Set(record.probable_cause.into()),
            suggested_fix: Set(record.suggested_fix.clone()),
            severity: Set(record.severity.into()),
            confidence: Set(record.confidence),
            follow_up_questions: Set(to_json(record, &record.follow_up_questions)?),
            status: Set(record.status.into()),
            image_filename: Set(metadata.filename.clone()),
            image_size_bytes: Set(metadata.size_bytes as i64),
            requester_ip: Set(metadata.requester_ip.clone()),
            user_agent: Set(metadata.user_agent.clone()),
            created_at: Set(created_at.into()),
        };

        image_analysis::Entity::insert(active_model)
            .exec(self.db.as_ref())
            .await?;

        Ok(AnalysisRecord {
            created_at: Some(created_at),
            ..record.clone()
        })
    }

    async fn list_recent(&self, limit: u64) -> Result<Vec<AnalysisRecord>, RepositoryError> {
        let models = image_analysis::Entity::find()
            .order_by_desc(image_analysis::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(AnalysisRecord::try_from).collect()
    }
}

fn to_json<T: serde::Serialize>(
    record: &AnalysisRecord,
    value: &T,
) -> Result<Value, RepositoryError> {
    serde_json::to_value(value).map_err(|e| RepositoryError::Corrupt {
        id: record.analysis_id.to_string(),
        reason: e.to_string(),
    })
}

impl TryFrom<image_analysis::Model> for AnalysisRecord {
    type Error = RepositoryError;

    fn try_from(model: image_analysis::Model) -> Result<Self, Self::Error> {
        let id = model.analysis_id;
        let corrupt = |reason: String| RepositoryError::Corrupt {
            id: id.to_string(),
            reason,
        };

        let key_text_blocks: Vec<KeyTextBlock> =
            serde_json::from_value(model.key_text_blocks.clone())
                .map_err(|e| corrupt(format!("key_text_blocks: {}", e)))?;
        let follow_up_questions: Vec<String> =
            serde_json::from_value(model.follow_up_questions.clone())
                .map_err(|e| corrupt(format!("follow_up_questions: {}", e)))?;
        let environment = match model.environment.clone() {
            Some(Value::Object(map)) => Some(map),
            Some(Value::Null) | None => None,
            Some(other) => return Err(corrupt(format!("environment: {}", other))),
        };

        Ok(Self {
            analysis_id: id,
            error_title: model.error_title,
            error_code: model.error_code,
            product: model.product,
            environment,
            key_text_blocks,
            probable_cause: model.probable_cause.into(),
            suggested_fix: model.suggested_fix,
            severity: model.severity.into(),
            confidence: model.confidence,
            follow_up_questions,
            status: model.status.into(),
            created_at: Some(model.created_at.into()),
        })
    }
}
