// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 启动 Prometheus 指标导出器
///
/// 未启用或地址无效时只记录日志，不影响服务启动
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        info!("Metrics exporter disabled");
        return;
    }

    let addr: SocketAddr = match settings.address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", settings.address, e);
            return;
        }
    };

    // Address already in use is common in development; keep serving without metrics
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}", e);
        return;
    }

    metrics::describe_counter!(
        "errsnap_analyses_total",
        "Image analysis requests by outcome"
    );
    metrics::describe_counter!(
        "errsnap_persistence_failures_total",
        "Analyses returned to the caller but not stored"
    );
    metrics::describe_histogram!(
        "errsnap_vision_request_seconds",
        "Latency of the vision API call"
    );

    info!("Metrics exporter listening on {}", addr);
}
