// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 错误标题的最大字符数
pub const MAX_TITLE_CHARS: usize = 100;
/// 修复建议的最大字符数
pub const MAX_FIX_CHARS: usize = 500;
/// 追问问题的最大数量
pub const MAX_FOLLOW_UP_QUESTIONS: usize = 3;
/// 模型未给出标题时使用的默认值
pub const DEFAULT_ERROR_TITLE: &str = "Unknown Error";
/// 模型未给出修复建议时使用的默认值
pub const DEFAULT_SUGGESTED_FIX: &str = "No suggestion available";
/// 模型未给出置信度时使用的默认值
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// 截图分析记录
///
/// 一次成功分析的规范化结果。所有字段在生成时均已填充，
/// 持久化之后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// 服务端生成的唯一标识符
    pub analysis_id: Uuid,
    /// 简短的错误标题，不超过100个字符
    pub error_title: String,
    /// 截图中可见的错误码
    pub error_code: Option<String>,
    /// 出错的产品或服务名称
    pub product: Option<String>,
    /// 运行环境信息（os、browser、app、version 等）
    pub environment: Option<Map<String, Value>>,
    /// 关键文本区域，保持模型输出顺序
    pub key_text_blocks: Vec<KeyTextBlock>,
    /// 可能原因，取自固定分类
    pub probable_cause: ProbableCause,
    /// 修复建议，不超过500个字符
    pub suggested_fix: String,
    /// 严重程度
    pub severity: Severity,
    /// 分析置信度，范围 0 到 1
    pub confidence: f64,
    /// 需要向用户追问的问题，最多3个
    pub follow_up_questions: Vec<String>,
    /// 分析状态
    pub status: AnalysisStatus,
    /// 存储写入时间，仅在写入成功后存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// 关键文本区域
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyTextBlock {
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: f64,
}

/// 文本区域的包围盒，序列化为 `[x, y, w, h]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x, y, w, h]: [f64; 4]) -> Self {
        Self { x, y, w, h }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.w, b.h]
    }
}

/// 可能原因分类
///
/// 模型必须从这十个类别中选择其一，无法识别的取值归为 `Unknown`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProbableCause {
    NetworkError,
    AuthenticationError,
    PermissionDenied,
    Timeout,
    NotFound,
    RateLimit,
    InvalidInput,
    ServerError,
    DependencyDown,
    #[default]
    Unknown,
}

impl ProbableCause {
    /// 分类中的全部取值，按提示词中的顺序排列
    pub const ALL: [ProbableCause; 10] = [
        ProbableCause::NetworkError,
        ProbableCause::AuthenticationError,
        ProbableCause::PermissionDenied,
        ProbableCause::Timeout,
        ProbableCause::NotFound,
        ProbableCause::RateLimit,
        ProbableCause::InvalidInput,
        ProbableCause::ServerError,
        ProbableCause::DependencyDown,
        ProbableCause::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbableCause::NetworkError => "network_error",
            ProbableCause::AuthenticationError => "authentication_error",
            ProbableCause::PermissionDenied => "permission_denied",
            ProbableCause::Timeout => "timeout",
            ProbableCause::NotFound => "not_found",
            ProbableCause::RateLimit => "rate_limit",
            ProbableCause::InvalidInput => "invalid_input",
            ProbableCause::ServerError => "server_error",
            ProbableCause::DependencyDown => "dependency_down",
            ProbableCause::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProbableCause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbableCause {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ProbableCause::ALL
            .into_iter()
            .find(|cause| cause.as_str() == wanted)
            .ok_or(())
    }
}

/// 严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(()),
        }
    }
}

/// 分析状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    Ok,
    Failed,
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnalysisStatus::Ok => write!(f, "ok"),
            AnalysisStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 随分析记录一起写入存储的请求元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    /// 原始文件名
    pub filename: String,
    /// 图片字节数
    pub size_bytes: u64,
    /// 调用方IP，无法获取时为 "unknown"
    pub requester_ip: String,
    /// 调用方 User-Agent，无法获取时为 "unknown"
    pub user_agent: String,
}
