// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::analysis::{AnalysisRecord, ImageMetadata};
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 已存储的数据无法还原为领域模型
    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// 分析记录仓库特质
///
/// 只支持追加写入和按创建时间倒序读取最近的记录
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    /// 写入一条分析记录及其请求元数据
    ///
    /// 返回带有存储分配的 `created_at` 的记录
    async fn create(
        &self,
        record: &AnalysisRecord,
        metadata: &ImageMetadata,
    ) -> Result<AnalysisRecord, RepositoryError>;
    /// 按创建时间倒序列出最近的 `limit` 条记录
    async fn list_recent(&self, limit: u64) -> Result<Vec<AnalysisRecord>, RepositoryError>;
}
