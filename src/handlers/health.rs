//! 健康检查处理器

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::{db, middleware::AppState};

/// 健康检查响应
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

static APP_START_TIME: OnceCell<Instant> = OnceCell::new();

/// 记录应用启动时间，重复调用无效果
pub fn set_start_time() {
    APP_START_TIME.get_or_init(Instant::now);
}

/// 应用运行时间（秒）
pub fn get_uptime() -> u64 {
    APP_START_TIME
        .get()
        .map_or(0, |start| start.elapsed().as_secs())
}

/// 存活 + 数据库检查；数据库不可用时返回 503
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (status_code, status, database, message) = match db::health_check(&state.db).await {
        db::HealthStatus::Healthy => (StatusCode::OK, "ok", "healthy", None),
        db::HealthStatus::Unhealthy(msg) => {
            tracing::warn!(error = %msg, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "degraded",
                "unhealthy",
                Some("database unreachable".to_string()),
            )
        }
    };

    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: get_uptime(),
        database: database.to_string(),
        message,
    };

    (status_code, Json(body))
}
