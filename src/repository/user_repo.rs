//! User repository (数据库访问层)

use crate::{error::AppError, models::user::*};
use sqlx::PgConnection;
use uuid::Uuid;

/// 邮箱冲突的统一提示
pub const EMAIL_CONFLICT: &str = "Email already registered";

/// 根据 ID 查找用户
pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(user)
}

/// 根据 ID 查找用户并加行锁，必须在事务内调用
pub async fn find_by_id_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(user)
}

/// 根据邮箱查找用户
pub async fn find_by_email(
    conn: &mut PgConnection,
    email: &str,
) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(user)
}

/// 创建用户；唯一约束冲突转换为 Conflict
pub async fn insert(conn: &mut PgConnection, new_user: &NewUser) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, full_name)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(&new_user.full_name)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::from_unique_violation(e, EMAIL_CONFLICT))
}

/// 分页列出用户
pub async fn list(conn: &mut PgConnection, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;

    Ok(users)
}

/// 用户总数
pub async fn count(conn: &mut PgConnection) -> Result<i64, AppError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await?;

    Ok(total)
}

/// 更新用户；未提供的字段保持不变
pub async fn update(
    conn: &mut PgConnection,
    id: Uuid,
    changes: &UserChanges,
) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET
            email = COALESCE($2, email),
            full_name = COALESCE($3, full_name),
            password_hash = COALESCE($4, password_hash),
            is_active = COALESCE($5, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&changes.email)
    .bind(&changes.full_name)
    .bind(&changes.password_hash)
    .bind(changes.is_active)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::from_unique_violation(e, EMAIL_CONFLICT))
}

/// 删除用户（刷新令牌由外键级联删除）
pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
