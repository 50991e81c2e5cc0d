//! 用户管理的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::user::*,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

fn parse_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    let Path(id) = path.map_err(|rej| AppError::validation(rej.body_text()))?;
    Ok(id)
}

/// 注册用户（公开）
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body.map_err(|rej| AppError::validation(rej.body_text()))?;

    let user = state.user_service.create_user(req).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// 列出用户
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query.map_err(|rej| AppError::validation(rej.body_text()))?;

    let page = state.user_service.list_users(query).await?;

    Ok(Json(page))
}

/// 当前登录用户
pub async fn get_current_user(auth: AuthContext) -> Result<impl IntoResponse, AppError> {
    Ok(Json(UserResponse::from(auth.user)))
}

/// 获取用户详情
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(path)?;

    let user = state.user_service.get_user(id).await?;

    Ok(Json(user))
}

/// 部分更新用户
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(path)?;
    let Json(req) = body.map_err(|rej| AppError::validation(rej.body_text()))?;

    tracing::debug!(actor = %auth.user.id, target = %id, "Updating user");
    let user = state.user_service.update_user(id, req).await?;

    Ok(Json(user))
}

/// 删除用户
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(path)?;

    tracing::debug!(actor = %auth.user.id, target = %id, "Deleting user");
    state.user_service.delete_user(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
