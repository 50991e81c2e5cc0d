//! 认证相关的 HTTP 处理器

use crate::{error::AppError, middleware::AppState, models::auth::*};
use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    response::IntoResponse,
    Form, Json,
};
use std::sync::Arc;

/// 登录（OAuth2 password 表单，username 字段即邮箱）
pub async fn login(
    State(state): State<Arc<AppState>>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Form(req) = form.map_err(|rej| AppError::validation(rej.body_text()))?;

    let response = state
        .auth_service
        .authenticate(&req.username, &req.password)
        .await?;

    Ok(Json(response))
}

/// 刷新令牌，旧令牌随即失效
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body.map_err(|rej| AppError::validation(rej.body_text()))?;

    let response = state.auth_service.refresh(&req.refresh_token).await?;

    Ok(Json(response))
}
