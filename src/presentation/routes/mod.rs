// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::repositories::analysis_repository::AnalysisRepository;
use crate::domain::use_cases::analyze_image::AnalyzeImageUseCase;
use crate::presentation::handlers::{analysis_handler, history_handler};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 返回值
///
/// 返回未挂载依赖的路由
pub fn routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version))
        .route("/analyze-image", post(analysis_handler::analyze_image))
        .route("/analyses", get(history_handler::list_analyses))
}

/// 组装完整的应用
///
/// 挂载用例、仓库和配置，并加上请求体上限、CORS 和请求追踪
pub fn build_app(
    settings: &Settings,
    use_case: Arc<AnalyzeImageUseCase>,
    repository: Arc<dyn AnalysisRepository>,
) -> Router {
    routes()
        .layer(Extension(use_case))
        .layer(Extension(repository))
        .layer(Extension(settings.history.clone()))
        .layer(DefaultBodyLimit::max(settings.upload.body_limit_bytes()))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// 浏览器前端直接调用，允许任意来源
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
