//! 指标处理器
//! 提供 Prometheus 文本格式的 /metrics 端点

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::{db, middleware::AppState};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// 指标暴露端点
pub async fn metrics_export(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // 连接池状态在抓取时刷新
    db::record_pool_metrics(&state.db);
    metrics::gauge!("process_uptime_seconds").set(crate::handlers::health::get_uptime() as f64);

    (
        [(header::CONTENT_TYPE, HeaderValue::from_static(PROMETHEUS_CONTENT_TYPE))],
        state.metrics.render(),
    )
}
