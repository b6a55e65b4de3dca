// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use thiserror::Error;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// 上传错误类型
///
/// 全部属于调用方输入错误，在调用外部服务之前同步检出。
/// `Display` 文本即返回给调用方的 `reason`。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    /// 请求中没有图片
    #[error("No file provided")]
    Missing,

    /// multipart 请求体无法读取
    #[error("Malformed upload")]
    Malformed(String),

    /// 声明的类型不是 PNG 或 JPEG
    #[error("Invalid file type: {0}. Only PNG and JPEG are supported.")]
    UnsupportedType(String),

    /// 超过大小上限
    #[error("File size {} MB exceeds maximum of {} MB", format_mib(.size), format_limit(.max))]
    TooLarge { size: u64, max: u64 },

    /// image_url 不合法或指向被禁止的地址
    #[error("Invalid image_url")]
    InvalidImageUrl(String),

    /// 无法从 image_url 下载图片
    #[error("Failed to fetch image")]
    FetchFailed(String),
}

impl UploadError {
    /// 附加在 `error` 字段中的诊断信息
    pub fn detail(&self) -> Option<String> {
        match self {
            UploadError::Missing => Some("Missing required field: file".to_string()),
            UploadError::Malformed(detail)
            | UploadError::InvalidImageUrl(detail)
            | UploadError::FetchFailed(detail) => Some(detail.clone()),
            UploadError::UnsupportedType(_) | UploadError::TooLarge { .. } => None,
        }
    }
}

fn format_mib(bytes: &u64) -> String {
    format!("{:.2}", *bytes as f64 / BYTES_PER_MIB)
}

fn format_limit(bytes: &u64) -> String {
    let mib = *bytes as f64 / BYTES_PER_MIB;
    if mib.fract() == 0.0 {
        format!("{}", mib as u64)
    } else {
        format!("{:.2}", mib)
    }
}

/// 支持的图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// 根据声明的 Content-Type 识别格式，忽略大小写和参数部分
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// 待分析的图片
///
/// 来源可以是 multipart 中的 `file` 字段，也可以是从 `image_url` 下载的内容。
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// 原始文件名
    pub filename: String,
    /// 调用方声明的 Content-Type
    pub content_type: Option<String>,
    /// 图片内容
    pub data: Bytes,
}

/// 通过校验的图片
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub filename: String,
    pub format: ImageFormat,
    pub data: Bytes,
}

impl ImageUpload {
    /// 依次校验类型和大小
    ///
    /// # 参数
    ///
    /// * `max_bytes` - 允许的最大字节数
    ///
    /// # 返回值
    ///
    /// * `Ok(ValidatedImage)` - 校验通过的图片
    /// * `Err(UploadError)` - 类型不受支持或超过上限
    pub fn validate(self, max_bytes: u64) -> Result<ValidatedImage, UploadError> {
        let declared = self.content_type.as_deref().unwrap_or_default();
        let format = ImageFormat::from_content_type(declared).ok_or_else(|| {
            UploadError::UnsupportedType(if declared.is_empty() {
                "none".to_string()
            } else {
                declared.to_string()
            })
        })?;

        let size = self.data.len() as u64;
        if size > max_bytes {
            return Err(UploadError::TooLarge {
                size,
                max: max_bytes,
            });
        }

        Ok(ValidatedImage {
            filename: self.filename,
            format,
            data: self.data,
        })
    }
}

impl ValidatedImage {
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    /// 编码为 `data:<mime>;base64,<payload>` 形式
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            BASE64.encode(&self.data)
        )
    }
}
