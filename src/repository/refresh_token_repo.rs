//! Refresh token repository (刷新令牌数据访问)

use crate::{error::AppError, models::refresh_token::RefreshToken};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

/// 存储刷新令牌（仅保存摘要）
pub async fn insert(
    conn: &mut PgConnection,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<RefreshToken, AppError> {
    let token = sqlx::query_as::<_, RefreshToken>(
        r#"
        INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(token)
}

/// 根据摘要查找刷新令牌并加行锁，必须在事务内调用
pub async fn find_by_hash_for_update(
    conn: &mut PgConnection,
    token_hash: &str,
) -> Result<Option<RefreshToken>, AppError> {
    let token = sqlx::query_as::<_, RefreshToken>(
        "SELECT * FROM refresh_tokens WHERE token_hash = $1 FOR UPDATE",
    )
    .bind(token_hash)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(token)
}

/// 删除刷新令牌（轮换时使用）
pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 撤销用户的所有刷新令牌
pub async fn revoke_all_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE",
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// 清理用户已过期或已撤销的刷新令牌
pub async fn delete_stale_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query(
        "DELETE FROM refresh_tokens WHERE user_id = $1 AND (expires_at <= NOW() OR revoked = TRUE)",
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// 统计用户持有的刷新令牌数量
pub async fn count_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}
