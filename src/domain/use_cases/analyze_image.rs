// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::models::analysis::{AnalysisRecord, ImageMetadata};
use crate::domain::models::image_upload::{ImageUpload, UploadError};
use crate::domain::repositories::analysis_repository::AnalysisRepository;
use crate::domain::services::image_fetcher::ImageFetcher;
use crate::domain::services::reply_parser::{parse_reply, ReplyParseError};
use crate::domain::services::vision_service::{VisionError, VisionServiceTrait};

/// 图片来源
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// multipart 中的 `file` 字段
    Upload(ImageUpload),
    /// multipart 中的 `image_url` 字段
    Url(String),
}

/// 一次分析请求
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub source: ImageSource,
    pub requester_ip: String,
    pub user_agent: String,
}

/// 分析流程错误
///
/// 持久化失败不在其中：写入失败只记录日志，记录仍然返回给调用方。
#[derive(Error, Debug)]
pub enum AnalyzeError {
    /// 调用方输入错误
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// 视觉模型服务失败
    #[error("Vision API error")]
    Vision(#[source] VisionError),

    /// 模型回复无法解析
    #[error(transparent)]
    Parse(#[from] ReplyParseError),

    /// 其他内部错误
    #[error("Internal server error")]
    Internal(String),
}

impl From<VisionError> for AnalyzeError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::NotConfigured => AnalyzeError::Internal(err.to_string()),
            other => AnalyzeError::Vision(other),
        }
    }
}

impl AnalyzeError {
    /// 指标标签
    pub fn outcome(&self) -> &'static str {
        match self {
            AnalyzeError::Upload(_) => "rejected",
            AnalyzeError::Vision(_) => "upstream_error",
            AnalyzeError::Parse(_) => "parse_error",
            AnalyzeError::Internal(_) => "internal_error",
        }
    }
}

/// 截图分析用例
///
/// 校验 → 调用视觉模型 → 解析 → 持久化 → 返回，每次调用只发出一次模型请求，
/// 最多写入一次存储。
pub struct AnalyzeImageUseCase {
    vision: Arc<dyn VisionServiceTrait>,
    repository: Arc<dyn AnalysisRepository>,
    fetcher: ImageFetcher,
    max_upload_bytes: u64,
}

impl AnalyzeImageUseCase {
    pub fn new(
        vision: Arc<dyn VisionServiceTrait>,
        repository: Arc<dyn AnalysisRepository>,
        fetcher: ImageFetcher,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            vision,
            repository,
            fetcher,
            max_upload_bytes,
        }
    }

    pub async fn execute(&self, request: AnalysisRequest) -> Result<AnalysisRecord, AnalyzeError> {
        let upload = match request.source {
            ImageSource::Upload(upload) => upload,
            ImageSource::Url(url) => self.fetcher.fetch(&url, self.max_upload_bytes).await?,
        };

        let image = upload.validate(self.max_upload_bytes).map_err(|e| {
            warn!("Rejected upload: {}", e);
            e
        })?;
        info!(
            "File validated: {} {} {} bytes",
            image.filename,
            image.format.mime_type(),
            image.size_bytes()
        );

        info!("Sending request to vision API");
        let reply = self.vision.analyze_image(&image.to_data_url()).await?;
        info!("Received response from vision API");

        let raw = parse_reply(&reply.content).map_err(|e| {
            error!("Failed to parse vision API response: {}", e.source);
            e
        })?;
        let record = raw.into_record(Uuid::new_v4());

        let size_bytes = image.size_bytes();
        let metadata = ImageMetadata {
            filename: image.filename,
            size_bytes,
            requester_ip: request.requester_ip,
            user_agent: request.user_agent,
        };

        // A failed insert still returns the analysis; history just won't have it
        match self.repository.create(&record, &metadata).await {
            Ok(stored) => {
                info!("Analysis saved to database: {}", stored.analysis_id);
                Ok(stored)
            }
            Err(e) => {
                error!("Database error for {}: {}", record.analysis_id, e);
                metrics::counter!("errsnap_persistence_failures_total").increment(1);
                Ok(record)
            }
        }
    }
}
