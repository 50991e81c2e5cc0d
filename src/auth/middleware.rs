//! 认证提取器

use crate::{error::AppError, middleware::AppState, models::user::User};
use axum::{extract::FromRequestParts, http::HeaderMap};
use std::sync::Arc;

/// 认证上下文
///
/// 每次提取都会重新加载用户并检查 is_active，停用立即生效
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)?;
        let user = state.auth_service.current_user(&token).await?;

        Ok(AuthContext { user })
    }
}

/// 从 Authorization 头提取 Bearer 令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .ok_or(AppError::Unauthorized)
}
