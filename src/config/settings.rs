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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 上传大小上限默认值（15 MiB）
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 15 * 1024 * 1024;

/// 应用程序配置设置
///
/// 进程启动时加载一次，随后以参数形式注入到各组件中，
/// 业务逻辑内部不再读取环境变量
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 视觉模型服务配置
    pub vision: VisionSettings,
    /// 图片上传配置
    pub upload: UploadSettings,
    /// 历史记录查询配置
    pub history: HistorySettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 视觉模型服务配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct VisionSettings {
    /// API密钥，以Bearer令牌形式发送
    pub api_key: Option<String>,
    /// 模型名称
    pub model: String,
    /// API基础URL，请求发往 `{api_base_url}/chat/completions`
    pub api_base_url: String,
    /// 输出令牌上限
    pub max_tokens: u32,
    /// 采样温度
    pub temperature: f32,
}

/// 图片上传配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    /// 单张图片的最大字节数
    pub max_bytes: u64,
    /// 通过 image_url 拉取图片的超时时间（秒）
    pub image_fetch_timeout_secs: u64,
    /// 是否允许 image_url 指向私有或回环地址
    pub allow_private_image_hosts: bool,
    /// 免于地址检查的来源，形如 `http://10.0.0.5:8080`，按 scheme、主机和端口精确匹配
    #[serde(default)]
    pub trusted_image_origins: Vec<String>,
    /// image_url 最多跟随的重定向次数
    pub max_image_redirects: usize,
}

/// 历史记录查询配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct HistorySettings {
    /// 未指定 limit 时返回的记录数
    pub default_limit: u64,
    /// 单次查询允许的最大记录数
    pub max_limit: u64,
}

/// 指标导出配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启动 Prometheus 导出器
    pub enabled: bool,
    /// 导出器监听地址
    pub address: String,
}

impl UploadSettings {
    /// 请求体上限，留出 multipart 编码开销，使超限文件仍能进入校验流程
    pub fn body_limit_bytes(&self) -> usize {
        (self.max_bytes as usize).saturating_mul(2)
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次读取默认值、`config/default`、`config/{APP_ENVIRONMENT}` 以及
    /// `ERRSNAP__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("ERRSNAP").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 仅包含默认值的配置，不读取文件或环境变量
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite://errsnap.db?mode=rwc")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            .set_default("vision.model", "gpt-4o-mini")?
            .set_default("vision.api_base_url", "https://api.openai.com/v1")?
            .set_default("vision.max_tokens", 1500)?
            .set_default("vision.temperature", 0.3)?
            .set_default("upload.max_bytes", DEFAULT_MAX_UPLOAD_BYTES)?
            .set_default("upload.image_fetch_timeout_secs", 30)?
            .set_default("upload.allow_private_image_hosts", false)?
            .set_default("upload.max_image_redirects", 5)?
            .set_default("history.default_limit", 20)?
            .set_default("history.max_limit", 100)?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.address", "0.0.0.0:9000")
    }
}
