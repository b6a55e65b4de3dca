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

use axum::{
    extract::{multipart::MultipartRejection, Extension, Multipart},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::models::image_upload::{ImageUpload, UploadError};
use crate::domain::use_cases::analyze_image::{
    AnalysisRequest, AnalyzeError, AnalyzeImageUseCase, ImageSource,
};
use crate::presentation::extractors::client_info::ClientInfo;

const FILE_FIELD: &str = "file";
const IMAGE_URL_FIELD: &str = "image_url";

/// 分析上传的错误截图
///
/// 接收 multipart 表单中的 `file` 或 `image_url` 字段，返回规范化后的分析记录
pub async fn analyze_image(
    Extension(use_case): Extension<Arc<AnalyzeImageUseCase>>,
    client: ClientInfo,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    info!("Received image analysis request from {}", client.requester_ip);

    let result = match read_image_source(multipart).await {
        Ok(source) => {
            use_case
                .execute(AnalysisRequest {
                    source,
                    requester_ip: client.requester_ip,
                    user_agent: client.user_agent,
                })
                .await
        }
        Err(e) => Err(AnalyzeError::Upload(e)),
    };

    match result {
        Ok(record) => {
            metrics::counter!("errsnap_analyses_total", "outcome" => "ok").increment(1);
            info!("Analysis complete: {}", record.analysis_id);
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(e) => {
            metrics::counter!("errsnap_analyses_total", "outcome" => e.outcome()).increment(1);
            match &e {
                AnalyzeError::Upload(_) => warn!("Analysis rejected: {}", e),
                _ => error!("Analysis failed: {}", e),
            }
            e.into_response()
        }
    }
}

/// 从 multipart 表单中取出图片来源
///
/// `file` 优先于 `image_url`；其余字段忽略
async fn read_image_source(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ImageSource, UploadError> {
    let mut multipart = multipart.map_err(|e| UploadError::Malformed(e.body_text()))?;
    let mut image_url = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Malformed(e.body_text()))?
    {
        match field.name() {
            Some(FILE_FIELD) => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| UploadError::Malformed(e.body_text()))?;

                return Ok(ImageSource::Upload(ImageUpload {
                    filename,
                    content_type,
                    data,
                }));
            }
            Some(IMAGE_URL_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| UploadError::Malformed(e.body_text()))?;
                let text = text.trim();
                if !text.is_empty() {
                    image_url = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    image_url.map(ImageSource::Url).ok_or(UploadError::Missing)
}
