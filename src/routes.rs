//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{handlers, middleware::AppState};

/// 版本化 API 前缀
pub const API_PREFIX: &str = "/api/v1";

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 运维端点（健康检查、指标），不带版本前缀
    let ops_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics_export));

    // 认证路由（无需认证）
    let auth_routes = Router::new()
        .route("/auth/token", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh_token));

    // 用户管理：除注册外均由 AuthContext 提取器强制认证
    let user_routes = Router::new()
        .route(
            "/users",
            get(handlers::user::list_users).post(handlers::user::create_user),
        )
        .route("/users/me", get(handlers::user::get_current_user))
        .route(
            "/users/{id}",
            get(handlers::user::get_user)
                .patch(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        );

    let api_routes = Router::new().merge(auth_routes).merge(user_routes);

    let max_body_bytes = state.config.server.max_body_bytes;

    // 组合所有路由
    Router::new()
        .merge(ops_routes)
        .nest(API_PREFIX, api_routes)
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
