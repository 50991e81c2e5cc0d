//! Refresh token records

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Persisted refresh token. Only the SHA-256 digest of the opaque token is stored.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a stored token. Rotation deletes the row, so there is
/// no "used" state to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Valid,
    Expired,
    Revoked,
}

impl RefreshToken {
    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked {
            RefreshTokenState::Revoked
        } else if self.expires_at <= now {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Valid
        }
    }
}
