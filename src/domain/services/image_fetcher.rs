// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use bytes::BytesMut;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::settings::UploadSettings;
use crate::domain::models::image_upload::{ImageFormat, ImageUpload, UploadError};
use crate::utils::validators::{validate_image_url, ImageHostPolicy, ImageTarget};

/// 图片下载器
///
/// 处理 multipart 中的 `image_url` 字段：下载图片并以响应头中的
/// Content-Type 作为声明类型，交给与文件上传相同的校验流程。
///
/// 重定向由下载器逐跳跟随，每一跳都重新做地址检查，
/// 请求只发往检查时解析出的地址。
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    timeout: Duration,
    policy: ImageHostPolicy,
    max_redirects: usize,
}

impl ImageFetcher {
    pub fn new(settings: &UploadSettings) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(settings.image_fetch_timeout_secs);
        Ok(Self {
            client: Self::client_builder(timeout).build()?,
            timeout,
            policy: ImageHostPolicy {
                allow_private_hosts: settings.allow_private_image_hosts,
                trusted_origins: settings.trusted_image_origins.clone(),
            },
            max_redirects: settings.max_image_redirects,
        })
    }

    fn client_builder(timeout: Duration) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .user_agent(concat!("errsnap/", env!("CARGO_PKG_VERSION")))
    }

    /// 域名主机使用固定了解析结果的客户端，其余复用共享客户端
    fn client_for(&self, target: &ImageTarget) -> Result<reqwest::Client, UploadError> {
        match target.url.host_str() {
            Some(domain) if !target.pinned_addrs.is_empty() => Self::client_builder(self.timeout)
                .resolve_to_addrs(domain, &target.pinned_addrs)
                .build()
                .map_err(|e| UploadError::FetchFailed(e.to_string())),
            _ => Ok(self.client.clone()),
        }
    }

    async fn check(&self, raw: &str) -> Result<ImageTarget, UploadError> {
        validate_image_url(raw, &self.policy).await.map_err(|e| {
            warn!("Rejected image_url {}: {}", raw, e);
            UploadError::InvalidImageUrl(e.to_string())
        })
    }

    /// 下载图片
    ///
    /// # 参数
    ///
    /// * `image_url` - 图片地址，仅支持 http/https
    /// * `max_bytes` - 允许的最大字节数，超出时立即停止读取
    ///
    /// # 返回值
    ///
    /// * `Ok(ImageUpload)` - 下载完成的图片，文件名取自URL最后一段路径
    /// * `Err(UploadError)` - 地址无效、下载失败、类型不受支持或超过上限
    pub async fn fetch(&self, image_url: &str, max_bytes: u64) -> Result<ImageUpload, UploadError> {
        let mut target = self.check(image_url).await?;

        let filename = target
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .unwrap_or("image")
            .to_string();

        let mut redirects = 0;
        let mut response = loop {
            let response = self
                .client_for(&target)?
                .get(target.url.clone())
                .send()
                .await
                .map_err(|e| UploadError::FetchFailed(e.to_string()))?;

            if !response.status().is_redirection() {
                break response;
            }
            if redirects >= self.max_redirects {
                return Err(UploadError::FetchFailed(format!(
                    "Too many redirects (max {})",
                    self.max_redirects
                )));
            }
            redirects += 1;

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| {
                    UploadError::FetchFailed(format!(
                        "Image host returned {} without a Location",
                        response.status()
                    ))
                })?;
            let next = target
                .url
                .join(location)
                .map_err(|e| UploadError::InvalidImageUrl(e.to_string()))?;
            debug!("Following image_url redirect to {}", next);
            target = self.check(next.as_str()).await?;
        };

        if !response.status().is_success() {
            return Err(UploadError::FetchFailed(format!(
                "Image host returned {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        // Type before size, same order as direct uploads
        let declared = content_type.as_deref().unwrap_or_default();
        if ImageFormat::from_content_type(declared).is_none() {
            return Err(UploadError::UnsupportedType(if declared.is_empty() {
                "none".to_string()
            } else {
                declared.to_string()
            }));
        }

        if let Some(length) = response.content_length() {
            if length > max_bytes {
                return Err(UploadError::TooLarge {
                    size: length,
                    max: max_bytes,
                });
            }
        }

        let mut data = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| UploadError::FetchFailed(e.to_string()))?
        {
            data.extend_from_slice(&chunk);
            if data.len() as u64 > max_bytes {
                return Err(UploadError::TooLarge {
                    size: data.len() as u64,
                    max: max_bytes,
                });
            }
        }

        debug!("Fetched {} bytes from image_url", data.len());

        Ok(ImageUpload {
            filename,
            content_type,
            data: data.freeze(),
        })
    }
}
