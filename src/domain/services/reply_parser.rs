// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::analysis::{
    AnalysisRecord, AnalysisStatus, BoundingBox, KeyTextBlock, ProbableCause, Severity,
    DEFAULT_CONFIDENCE, DEFAULT_ERROR_TITLE, DEFAULT_SUGGESTED_FIX, MAX_FIX_CHARS,
    MAX_FOLLOW_UP_QUESTIONS, MAX_TITLE_CHARS,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

static TAGGED_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?si)```json[ \t]*\r?\n(.*?)\r?\n[ \t]*```")
        .expect("Failed to compile tagged fence regex")
});

static UNTAGGED_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[ \t]*\r?\n(.*?)\r?\n[ \t]*```")
        .expect("Failed to compile untagged fence regex")
});

/// 模型回复解析错误
#[derive(Error, Debug)]
#[error("Failed to parse AI response")]
pub struct ReplyParseError {
    /// 模型返回的原始文本
    pub raw_content: String,
    #[source]
    pub source: serde_json::Error,
}

/// 从模型回复中取出 JSON 文本
///
/// 按 ```` ```json ```` 围栏、无标签围栏、原始文本的顺序尝试，
/// 返回去除首尾空白后的内容。
pub fn extract_json_block(content: &str) -> &str {
    TAGGED_FENCE
        .captures(content)
        .or_else(|| UNTAGGED_FENCE.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(content)
        .trim()
}

/// 将模型回复解析为临时结构
///
/// # 错误
///
/// 文本不是 JSON 对象时返回 `ReplyParseError`，其中保留原始文本
pub fn parse_reply(content: &str) -> Result<RawAnalysis, ReplyParseError> {
    let fail = |source: serde_json::Error| ReplyParseError {
        raw_content: content.to_string(),
        source,
    };

    // Derived struct visitors also accept sequences; only objects are analyses
    match serde_json::from_str::<Value>(extract_json_block(content)).map_err(fail)? {
        object @ Value::Object(_) => RawAnalysis::deserialize(object).map_err(fail),
        other => Err(fail(serde::de::Error::custom(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        )))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// 模型输出的临时结构
///
/// 所有字段均可缺失且不限定类型，只有经过 [`RawAnalysis::into_record`]
/// 补齐默认值之后才成为 `AnalysisRecord`。
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawAnalysis {
    pub error_title: Option<Value>,
    pub error_code: Option<Value>,
    pub product: Option<Value>,
    pub environment: Option<Value>,
    pub key_text_blocks: Option<Value>,
    pub probable_cause: Option<Value>,
    pub suggested_fix: Option<Value>,
    pub severity: Option<Value>,
    pub confidence: Option<Value>,
    pub follow_up_questions: Option<Value>,
}

impl RawAnalysis {
    /// 补齐默认值并转换为规范化记录
    ///
    /// `analysis_id` 总是由调用方提供，模型输出中的任何标识都会被忽略。
    pub fn into_record(self, analysis_id: Uuid) -> AnalysisRecord {
        let error_title = text_value(self.error_title)
            .map(|title| truncate_chars(&title, MAX_TITLE_CHARS))
            .unwrap_or_else(|| DEFAULT_ERROR_TITLE.to_string());

        let suggested_fix = text_value(self.suggested_fix)
            .map(|fix| truncate_chars(&fix, MAX_FIX_CHARS))
            .unwrap_or_else(|| DEFAULT_SUGGESTED_FIX.to_string());

        let environment = match self.environment {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        };

        let key_text_blocks = match self.key_text_blocks {
            Some(Value::Array(items)) => items.iter().filter_map(parse_text_block).collect(),
            _ => Vec::new(),
        };

        let probable_cause = text_value(self.probable_cause)
            .and_then(|cause| cause.parse::<ProbableCause>().ok())
            .unwrap_or_default();

        let severity = text_value(self.severity)
            .and_then(|severity| severity.parse::<Severity>().ok())
            .unwrap_or_default();

        let follow_up_questions = match self.follow_up_questions {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| text_value(Some(item)))
                .take(MAX_FOLLOW_UP_QUESTIONS)
                .collect(),
            _ => Vec::new(),
        };

        AnalysisRecord {
            analysis_id,
            error_title,
            error_code: text_value(self.error_code),
            product: text_value(self.product),
            environment,
            key_text_blocks,
            probable_cause,
            suggested_fix,
            severity,
            confidence: unit_interval(self.confidence.as_ref()).unwrap_or(DEFAULT_CONFIDENCE),
            follow_up_questions,
            status: AnalysisStatus::Ok,
            created_at: None,
        }
    }
}

/// 字符串或数字转为非空文本，其余类型视为缺失
fn text_value(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// 读取 0 到 1 之间的数值，越界时截断
fn unit_interval(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then(|| number.clamp(0.0, 1.0))
}

fn parse_text_block(value: &Value) -> Option<KeyTextBlock> {
    let text = text_value(value.get("text").cloned())?;
    let bbox = ["bbox", "bounding_box", "box"]
        .iter()
        .find_map(|key| value.get(*key))
        .and_then(parse_bounding_box)
        .unwrap_or_default();
    let confidence = unit_interval(value.get("confidence")).unwrap_or(DEFAULT_CONFIDENCE);

    Some(KeyTextBlock {
        text,
        bbox,
        confidence,
    })
}

fn parse_bounding_box(value: &Value) -> Option<BoundingBox> {
    match value {
        Value::Array(items) if items.len() == 4 => {
            let mut coords = [0.0; 4];
            for (slot, item) in coords.iter_mut().zip(items) {
                *slot = item.as_f64()?;
            }
            Some(BoundingBox::from(coords))
        }
        Value::Object(map) => {
            let coord = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k)?.as_f64());
            Some(BoundingBox {
                x: coord(&["x"])?,
                y: coord(&["y"])?,
                w: coord(&["w", "width"])?,
                h: coord(&["h", "height"])?,
            })
        }
        _ => None,
    }
}
