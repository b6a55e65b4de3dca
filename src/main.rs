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

use errsnap::config::settings::Settings;
use errsnap::domain::repositories::analysis_repository::AnalysisRepository;
use errsnap::domain::services::image_fetcher::ImageFetcher;
use errsnap::domain::services::vision_service::{VisionService, VisionServiceTrait};
use errsnap::domain::use_cases::analyze_image::AnalyzeImageUseCase;
use errsnap::infrastructure::database::connection;
use errsnap::infrastructure::metrics;
use errsnap::infrastructure::repositories::analysis_repo_impl::AnalysisRepositoryImpl;
use errsnap::presentation::routes;
use errsnap::utils::telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting errsnap...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    metrics::init_metrics(&settings.metrics);

    if settings.vision.api_key.is_none() {
        warn!("Vision API key not configured; analysis requests will fail");
    }

    // 3. Connect to database and apply migrations
    let db = Arc::new(connection::connect_and_migrate(&settings.database).await?);

    // 4. Initialize components
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("errsnap/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let fetcher = ImageFetcher::new(&settings.upload)?;

    let repository: Arc<dyn AnalysisRepository> = Arc::new(AnalysisRepositoryImpl::new(db));
    let vision: Arc<dyn VisionServiceTrait> =
        Arc::new(VisionService::new(&settings.vision, http_client));
    let use_case = Arc::new(AnalyzeImageUseCase::new(
        vision,
        repository.clone(),
        fetcher,
        settings.upload.max_bytes,
    ));

    // 5. Start HTTP server
    let app = routes::build_app(&settings, use_case, repository);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
