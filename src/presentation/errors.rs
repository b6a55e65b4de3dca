// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::domain::repositories::analysis_repository::RepositoryError;
use crate::domain::services::vision_service::VisionError;
use crate::domain::use_cases::analyze_image::AnalyzeError;

/// 应用错误类型
///
/// 封装查询类接口的错误，提供统一的错误处理接口
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_message = self.0.to_string();

        let status = match self.0.downcast_ref::<RepositoryError>() {
            Some(RepositoryError::Database(_)) | Some(RepositoryError::Corrupt { .. }) => {
                error!("Repository error: {}", error_message);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            None => {
                if error_message.contains("validation") || error_message.contains("Validation") {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// 分析失败响应体
///
/// 所有失败都以 `status: "failed"` 加人类可读的 `reason` 返回
#[derive(Debug, Serialize)]
pub struct FailureBody {
    pub status: &'static str,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
}

impl FailureBody {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            status: "failed",
            reason: reason.into(),
            error: None,
            raw_content: None,
        }
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let reason = self.to_string();

        let (status, body) = match self {
            AnalyzeError::Upload(err) => (
                StatusCode::BAD_REQUEST,
                FailureBody {
                    error: err.detail(),
                    ..FailureBody::new(reason)
                },
            ),
            AnalyzeError::Vision(err) => {
                let detail = match err {
                    VisionError::Api { status, .. } => format!("API returned {}", status),
                    other => other.to_string(),
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    FailureBody {
                        error: Some(detail),
                        ..FailureBody::new(reason)
                    },
                )
            }
            AnalyzeError::Parse(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                FailureBody {
                    error: Some(err.source.to_string()),
                    raw_content: Some(err.raw_content),
                    ..FailureBody::new(reason)
                },
            ),
            AnalyzeError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                FailureBody {
                    error: Some(detail),
                    ..FailureBody::new(reason)
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}
