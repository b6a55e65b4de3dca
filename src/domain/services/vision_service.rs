// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::settings::VisionSettings;
use crate::domain::models::analysis::ProbableCause;

const USER_INSTRUCTION: &str =
    "Analyze this error screenshot and extract all relevant information for customer support triage.";

static SYSTEM_PROMPT: Lazy<String> = Lazy::new(|| {
    let taxonomy = ProbableCause::ALL
        .iter()
        .map(|cause| format!("- {}", cause.as_str()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an expert error analyzer for customer support. \
Extract structured information from error screenshots.

TAXONOMY for probable_cause (use EXACTLY one of these):
{taxonomy}

Extract:
1. error_title: Short, clear title (<=100 chars)
2. error_code: Any error code visible (or null)
3. product: Application/service name (or null)
4. environment: Object with os, browser, app, version if visible
5. key_text_blocks: Array of important text with bounding boxes [x,y,w,h] and confidence
6. probable_cause: From taxonomy above
7. suggested_fix: Actionable fix (<=500 chars)
8. severity: low, medium, or high
9. confidence: 0-1 score of analysis accuracy
10. follow_up_questions: 0-3 questions to ask user

Respond with a single JSON object using exactly these keys. Be precise and actionable."
    )
});

/// 固定的系统提示词，包含输出字段列表和可能原因分类
pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT.as_str()
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// 视觉模型的原始回复
#[derive(Debug, Clone)]
pub struct VisionReply {
    /// `choices[0].message.content` 的文本
    pub content: String,
    pub usage: TokenUsage,
}

/// 视觉模型调用错误
#[derive(Error, Debug)]
pub enum VisionError {
    /// 未配置API密钥
    #[error("Vision API key not configured")]
    NotConfigured,

    /// 请求未能送达
    #[error("Failed to send request to vision API: {0}")]
    Transport(String),

    /// 服务返回非成功状态码
    #[error("API returned {status}")]
    Api { status: u16, body: String },

    /// 回复中缺少消息内容
    #[error("Invalid response format from vision API: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait VisionServiceTrait: Send + Sync {
    /// 发送一张以 data URL 编码的图片并返回模型的文本回复
    async fn analyze_image(&self, image_data_url: &str) -> Result<VisionReply, VisionError>;
}

/// 视觉模型服务 - 处理与多模态补全接口的交互
///
/// # 配置
///
/// 由 [`VisionSettings`] 提供：
/// - `api_key` - 以 Bearer 令牌发送
/// - `model` - 模型名称
/// - `api_base_url` - 请求发往 `{api_base_url}/chat/completions`
/// - `max_tokens` / `temperature` - 解码参数
///
/// 每次分析只发出一次请求，不做重试，也不设置超时。
pub struct VisionService {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    api_base_url: String,
    max_tokens: u32,
    temperature: f32,
}

#[async_trait]
impl VisionServiceTrait for VisionService {
    async fn analyze_image(&self, image_data_url: &str) -> Result<VisionReply, VisionError> {
        VisionService::analyze_image(self, image_data_url).await
    }
}

impl VisionService {
    pub fn new(settings: &VisionSettings, client: reqwest::Client) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }

    /// 构造补全请求体
    pub fn request_body(&self, image_data_url: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": system_prompt()
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": USER_INSTRUCTION },
                        { "type": "image_url", "image_url": { "url": image_data_url } }
                    ]
                }
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature
        })
    }

    /// 调用视觉模型分析截图
    ///
    /// # 参数
    /// * `image_data_url` - `data:<mime>;base64,...` 形式的图片
    ///
    /// # 返回值
    /// * `Result<VisionReply, VisionError>` - 模型回复文本和令牌使用情况
    ///
    /// # 错误
    /// * 当API密钥未配置时返回错误
    /// * 当服务返回非成功状态或回复缺少内容时返回错误
    pub async fn analyze_image(&self, image_data_url: &str) -> Result<VisionReply, VisionError> {
        let api_key = self.api_key.as_ref().ok_or(VisionError::NotConfigured)?;

        let url = format!("{}/chat/completions", self.api_base_url);
        let started = Instant::now();
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&self.request_body(image_data_url))
            .send()
            .await
            .map_err(|e| VisionError::Transport(e.to_string()))?;
        metrics::histogram!("errsnap_vision_request_seconds")
            .record(started.elapsed().as_secs_f64());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("Vision API error: {} {}", status, body);
            return Err(VisionError::Api { status, body });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| VisionError::MalformedResponse(e.to_string()))?;

        let usage = body
            .get("usage")
            .map(|usage_val| TokenUsage {
                prompt_tokens: usage_val["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                completion_tokens: usage_val["completion_tokens"].as_u64().unwrap_or(0) as u32,
                total_tokens: usage_val["total_tokens"].as_u64().unwrap_or(0) as u32,
            })
            .unwrap_or_default();

        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                VisionError::MalformedResponse("missing choices[0].message.content".to_string())
            })?;

        debug!(total_tokens = usage.total_tokens, "Received vision API reply");

        Ok(VisionReply {
            content: content.to_string(),
            usage,
        })
    }
}
