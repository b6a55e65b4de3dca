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

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::models::analysis::AnalysisRecord;

/// 历史记录查询参数
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct HistoryQueryDto {
    /// 返回条数，缺省时使用配置中的默认值
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
}

impl HistoryQueryDto {
    /// 计算实际使用的条数
    pub fn effective_limit(&self, default_limit: u64, max_limit: u64) -> u64 {
        self.limit.unwrap_or(default_limit).clamp(1, max_limit.max(1))
    }
}

/// 历史记录响应
#[derive(Debug, Serialize)]
pub struct HistoryResponseDto {
    pub analyses: Vec<AnalysisRecord>,
    pub count: usize,
}

impl From<Vec<AnalysisRecord>> for HistoryResponseDto {
    fn from(analyses: Vec<AnalysisRecord>) -> Self {
        Self {
            count: analyses.len(),
            analyses,
        }
    }
}
