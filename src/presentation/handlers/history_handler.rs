// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::application::dto::history_query::{HistoryQueryDto, HistoryResponseDto};
use crate::config::settings::HistorySettings;
use crate::domain::repositories::analysis_repository::AnalysisRepository;
use crate::presentation::errors::AppError;

/// 查询最近的分析记录，按创建时间倒序
pub async fn list_analyses(
    Extension(repository): Extension<Arc<dyn AnalysisRepository>>,
    Extension(settings): Extension<HistorySettings>,
    query: Result<Query<HistoryQueryDto>, QueryRejection>,
) -> Result<Json<HistoryResponseDto>, AppError> {
    // Malformed query strings get the same JSON error body as range violations
    let Query(query) = query.map_err(|rejection| {
        AppError::from(anyhow::anyhow!(
            "Validation error: {}",
            rejection.body_text()
        ))
    })?;

    if let Err(errors) = query.validate() {
        return Err(AppError::from(anyhow::anyhow!(
            "Validation error: {}",
            errors
        )));
    }

    let limit = query.effective_limit(settings.default_limit, settings.max_limit);
    let analyses = repository.list_recent(limit).await?;

    Ok(Json(HistoryResponseDto::from(analyses)))
}
