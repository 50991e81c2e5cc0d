//! 用户管理服务

use crate::{
    auth::password::PasswordHasher,
    error::AppError,
    models::user::*,
    repository::{refresh_token_repo, user_repo, user_repo::EMAIL_CONFLICT},
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

const USER_NOT_FOUND: &str = "User not found";

pub struct UserService {
    db: PgPool,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            hasher: PasswordHasher::new(),
        }
    }

    /// 注册用户
    ///
    /// 先做应用层邮箱查重；并发插入时由唯一索引兜底，同样返回 Conflict
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<UserResponse, AppError> {
        req.validate()?;
        let password_hash = self.hasher.hash(&req.password)?;

        let new_user = NewUser {
            email: normalize_email(&req.email),
            password_hash,
            full_name: req.full_name,
        };

        let mut conn = self.db.acquire().await?;

        if user_repo::find_by_email(&mut conn, &new_user.email)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(EMAIL_CONFLICT));
        }

        let user = user_repo::insert(&mut conn, &new_user).await?;

        tracing::info!(user_id = %user.id, "User created");

        Ok(user.into())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserResponse, AppError> {
        let mut conn = self.db.acquire().await?;

        let user = user_repo::find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

        Ok(user.into())
    }

    /// 分页列出用户，按 created_at, id 排序
    pub async fn list_users(&self, query: ListUsersQuery) -> Result<UserPage, AppError> {
        query.validate()?;
        let offset = query.offset();

        let mut conn = self.db.acquire().await?;
        let users = user_repo::list(&mut conn, query.limit, offset).await?;
        let total = user_repo::count(&mut conn).await?;

        Ok(UserPage {
            items: users.into_iter().map(UserResponse::from).collect(),
            total,
            limit: query.limit,
            offset,
        })
    }

    /// 部分更新用户
    ///
    /// 停用账户或修改密码时，同一事务内撤销该用户全部刷新令牌
    pub async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> Result<UserResponse, AppError> {
        req.validate()?;

        let password_hash = match req.password.as_deref() {
            Some(password) => Some(self.hasher.hash(password)?),
            None => None,
        };

        let changes = UserChanges {
            email: req.email.as_deref().map(normalize_email),
            full_name: req.full_name,
            password_hash,
            is_active: req.is_active,
        };

        let mut tx = self.db.begin().await?;

        // 先确认目标存在，再做邮箱查重
        user_repo::find_by_id_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

        if let Some(email) = changes.email.as_deref() {
            if let Some(owner) = user_repo::find_by_email(&mut tx, email).await? {
                if owner.id != id {
                    return Err(AppError::conflict(EMAIL_CONFLICT));
                }
            }
        }

        let user = user_repo::update(&mut tx, id, &changes)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

        let revoke_sessions = changes.password_hash.is_some() || changes.is_active == Some(false);
        if revoke_sessions {
            let revoked = refresh_token_repo::revoke_all_for_user(&mut tx, id).await?;
            tracing::info!(user_id = %id, revoked_tokens = revoked, "Refresh tokens revoked");
        }

        tx.commit().await?;

        tracing::info!(user_id = %user.id, "User updated");

        Ok(user.into())
    }

    /// 删除用户，刷新令牌随外键级联删除
    pub async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        let mut conn = self.db.acquire().await?;

        if !user_repo::delete(&mut conn, id).await? {
            return Err(AppError::not_found(USER_NOT_FOUND));
        }

        tracing::info!(user_id = %id, "User deleted");

        Ok(())
    }
}
