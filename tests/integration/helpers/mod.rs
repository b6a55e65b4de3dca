// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use errsnap::config::settings::Settings;
use errsnap::domain::models::analysis::{AnalysisRecord, ImageMetadata};
use errsnap::domain::repositories::analysis_repository::{AnalysisRepository, RepositoryError};
use errsnap::domain::services::image_fetcher::ImageFetcher;
use errsnap::domain::services::vision_service::{VisionService, VisionServiceTrait};
use errsnap::domain::use_cases::analyze_image::AnalyzeImageUseCase;
use errsnap::infrastructure::database::connection;
use errsnap::infrastructure::repositories::analysis_repo_impl::AnalysisRepositoryImpl;
use errsnap::presentation::routes;
use sea_orm::{DatabaseConnection, DbErr};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BOUNDARY: &str = "errsnap-test-boundary";
pub const TEST_API_KEY: &str = "test-vision-key";

/// 测试应用
///
/// 视觉模型由 wiremock 模拟，数据库使用内存 SQLite
pub struct TestApp {
    pub app: Router,
    pub vision: MockServer,
    pub db: Arc<DatabaseConnection>,
}

/// 测试应用选项
#[derive(Clone)]
pub struct TestAppOptions {
    pub api_key: Option<String>,
    pub allow_private_image_hosts: bool,
    pub trusted_image_origins: Vec<String>,
    pub failing_store: bool,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            api_key: Some(TEST_API_KEY.to_string()),
            allow_private_image_hosts: false,
            trusted_image_origins: Vec::new(),
            failing_store: false,
        }
    }
}

/// 写入总是失败的仓库
pub struct FailingRepository;

#[async_trait]
impl AnalysisRepository for FailingRepository {
    async fn create(
        &self,
        _record: &AnalysisRecord,
        _metadata: &ImageMetadata,
    ) -> Result<AnalysisRecord, RepositoryError> {
        Err(RepositoryError::Database(DbErr::Custom(
            "store unavailable".to_string(),
        )))
    }

    async fn list_recent(&self, _limit: u64) -> Result<Vec<AnalysisRecord>, RepositoryError> {
        Err(RepositoryError::Database(DbErr::Custom(
            "store unavailable".to_string(),
        )))
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_options(TestAppOptions::default()).await
}

pub async fn create_test_app_with_options(options: TestAppOptions) -> TestApp {
    let vision = MockServer::start().await;

    let mut settings = Settings::defaults().expect("default settings");
    settings.database.url = "sqlite::memory:".to_string();
    settings.vision.api_key = options.api_key.clone();
    settings.vision.api_base_url = vision.uri();
    settings.upload.allow_private_image_hosts = options.allow_private_image_hosts;
    settings.upload.trusted_image_origins = options.trusted_image_origins.clone();

    let db = Arc::new(
        connection::connect_and_migrate(&settings.database)
            .await
            .expect("in-memory database"),
    );

    let repository: Arc<dyn AnalysisRepository> = if options.failing_store {
        Arc::new(FailingRepository)
    } else {
        Arc::new(AnalysisRepositoryImpl::new(db.clone()))
    };

    let client = reqwest::Client::new();
    let vision_service: Arc<dyn VisionServiceTrait> =
        Arc::new(VisionService::new(&settings.vision, client));
    let fetcher = ImageFetcher::new(&settings.upload).expect("image fetch client");
    let use_case = Arc::new(AnalyzeImageUseCase::new(
        vision_service,
        repository.clone(),
        fetcher,
        settings.upload.max_bytes,
    ));

    let app = routes::build_app(&settings, use_case, repository);

    TestApp { app, vision, db }
}

impl TestApp {
    /// 让视觉模型回复指定文本
    pub async fn mock_vision_reply(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(completion(content))
            .mount(&self.vision)
            .await;
    }

    /// 视觉模型收到的请求数
    pub async fn vision_calls(&self) -> usize {
        self.vision
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn upload(&self, filename: &str, content_type: &str, data: &[u8]) -> Response<Body> {
        self.send(upload_request(&[FormPart::File {
            filename,
            content_type,
            data,
        }]))
        .await
    }
}

/// 补全接口的成功回复
pub fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 812, "completion_tokens": 164, "total_tokens": 976 }
    }))
}

/// 一份完整的模型分析结果
pub fn sample_analysis() -> Value {
    json!({
        "error_title": "Connection refused",
        "error_code": "ECONNREFUSED",
        "product": "Acme CLI",
        "environment": { "os": "macOS 14.2" },
        "key_text_blocks": [
            { "text": "connect ECONNREFUSED 127.0.0.1:5432", "bbox": [12, 40, 300, 18], "confidence": 0.97 }
        ],
        "probable_cause": "network_error",
        "suggested_fix": "Start the database server and retry.",
        "severity": "high",
        "confidence": 0.9,
        "follow_up_questions": ["Is the database running?"]
    })
}

/// 指定大小的 PNG 数据，前 8 个字节为 PNG 签名
pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    data.resize(len.max(8), 0);
    data
}

pub enum FormPart<'a> {
    File {
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

/// 构造 multipart/form-data 请求体
pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::File {
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            FormPart::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(parts: &[FormPart<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze-image")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .header("user-agent", "errsnap-tests/1.0")
        .body(Body::from(multipart_body(parts)))
        .expect("valid request")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8_lossy(&bytes).into_owned()
}
