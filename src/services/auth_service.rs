//! 认证服务：登录、令牌刷新（轮换）、当前用户解析

use crate::{
    auth::{
        jwt::JwtService,
        password::PasswordHasher,
        token::{generate_refresh_token, hash_token},
    },
    config::AppConfig,
    error::AppError,
    models::{
        auth::TokenResponse,
        refresh_token::RefreshTokenState,
        user::{normalize_email, User},
    },
    repository::{refresh_token_repo, user_repo},
};
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
const INACTIVE_USER: &str = "Inactive user";

/// 未知邮箱时用于比对的哈希，使两种失败路径的耗时一致
static DUMMY_PASSWORD_HASH: Lazy<Option<String>> =
    Lazy::new(|| PasswordHasher::new().hash("timing-equalizer-password").ok());

pub struct AuthService {
    db: PgPool,
    jwt_service: Arc<JwtService>,
    hasher: PasswordHasher,
    refresh_token_ttl: Duration,
}

impl AuthService {
    pub fn new(db: PgPool, jwt_service: Arc<JwtService>, config: &AppConfig) -> Self {
        Self {
            db,
            jwt_service,
            hasher: PasswordHasher::new(),
            refresh_token_ttl: Duration::days(config.security.refresh_token_expire_days),
        }
    }

    /// 用户登录：校验凭据后签发访问令牌与刷新令牌
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<TokenResponse, AppError> {
        let email = normalize_email(email);

        let result = self.verify_credentials(&email, password).await;
        let user = match result {
            Ok(user) => user,
            Err(e) => {
                metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
                tracing::info!(email = %email, reason = %e, "Login rejected");
                return Err(e);
            }
        };

        let access_token = self.jwt_service.generate_access_token(&user.id)?;

        let mut tx = self.db.begin().await?;
        let purged = refresh_token_repo::delete_stale_for_user(&mut tx, user.id).await?;
        let refresh_token = self.issue_refresh_token(&mut tx, user.id).await?;
        tx.commit().await?;

        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
        tracing::info!(user_id = %user.id, purged_tokens = purged, "User logged in");

        Ok(TokenResponse::bearer(
            access_token,
            refresh_token,
            self.jwt_service.access_token_ttl_secs(),
        ))
    }

    /// 刷新令牌：在同一事务内删除旧令牌并写入新令牌
    pub async fn refresh(&self, presented_token: &str) -> Result<TokenResponse, AppError> {
        let result = self.rotate(presented_token).await;

        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("auth_refresh_total", "outcome" => outcome).increment(1);

        result
    }

    /// 解析访问令牌并加载当前用户；每次都重新检查 is_active
    pub async fn current_user(&self, access_token: &str) -> Result<User, AppError> {
        let claims = self.jwt_service.validate_access_token(access_token)?;
        let user_id = claims.user_id()?;

        let mut conn = self.db.acquire().await?;
        let user = user_repo::find_by_id(&mut conn, user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active {
            return Err(AppError::authentication(INACTIVE_USER));
        }

        Ok(user)
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, AppError> {
        let mut conn = self.db.acquire().await?;

        let Some(user) = user_repo::find_by_email(&mut conn, email).await? else {
            // 结果必然失败，只为付出与真实校验相同的哈希开销
            if let Some(dummy) = DUMMY_PASSWORD_HASH.as_deref() {
                let _ = self.hasher.verify(password, dummy);
            }
            return Err(AppError::authentication(INVALID_CREDENTIALS));
        };

        // 验证密码
        self.hasher
            .verify(password, &user.password_hash)
            .map_err(|e| match e {
                AppError::Unauthorized => AppError::authentication(INVALID_CREDENTIALS),
                other => other,
            })?;

        // 检查账户状态
        if !user.is_active {
            return Err(AppError::authentication(INACTIVE_USER));
        }

        Ok(user)
    }

    async fn rotate(&self, presented_token: &str) -> Result<TokenResponse, AppError> {
        let invalid = || AppError::authentication(INVALID_REFRESH_TOKEN);
        let token_hash = hash_token(presented_token);

        // 提前返回时事务被丢弃并回滚，旧令牌保持原状
        let mut tx = self.db.begin().await?;

        let record = refresh_token_repo::find_by_hash_for_update(&mut tx, &token_hash)
            .await?
            .ok_or_else(invalid)?;

        let state = record.state_at(Utc::now());
        if state != RefreshTokenState::Valid {
            tracing::info!(token_id = %record.id, state = ?state, "Refresh token rejected");
            return Err(invalid());
        }

        let user = user_repo::find_by_id(&mut tx, record.user_id)
            .await?
            .ok_or_else(invalid)?;

        if !user.is_active {
            return Err(AppError::authentication(INACTIVE_USER));
        }

        refresh_token_repo::delete(&mut tx, record.id).await?;
        let refresh_token = self.issue_refresh_token(&mut tx, user.id).await?;
        let access_token = self.jwt_service.generate_access_token(&user.id)?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, rotated = %record.id, "Refresh token rotated");

        Ok(TokenResponse::bearer(
            access_token,
            refresh_token,
            self.jwt_service.access_token_ttl_secs(),
        ))
    }

    /// 生成并存储新的刷新令牌，返回明文
    async fn issue_refresh_token(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<String, AppError> {
        let token = generate_refresh_token();
        let expires_at = Utc::now() + self.refresh_token_ttl;

        refresh_token_repo::insert(conn, user_id, &hash_token(&token), expires_at).await?;

        Ok(token)
    }
}
