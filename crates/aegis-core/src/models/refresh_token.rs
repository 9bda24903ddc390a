//! Refresh token domain model.
//!
//! A refresh token is a long-lived opaque credential rotated on each use.
//! Only the SHA-256 hash of the raw value is ever persisted. The single
//! legal mutation on a stored token is the transition to revoked; a revoked
//! token is never reactivated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// SHA-256 hex of the raw opaque token — the primary key.
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    /// What revoked the token: "refresh", "logout", or "revoke_all".
    pub revoked_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired(now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRefreshToken {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_in: i64) -> RefreshToken {
        let now = Utc::now();
        RefreshToken {
            token_hash: "abc".into(),
            user_id: Uuid::new_v4(),
            expires_at: now + Duration::seconds(expires_in),
            revoked_at: None,
            revoked_by: None,
            created_at: now,
        }
    }

    #[test]
    fn fresh_token_is_usable() {
        assert!(token(60).is_usable(Utc::now()));
    }

    #[test]
    fn expired_token_is_not_usable() {
        assert!(!token(-1).is_usable(Utc::now()));
    }

    #[test]
    fn revoked_token_is_not_usable() {
        let mut t = token(60);
        t.revoked_at = Some(Utc::now());
        t.revoked_by = Some("logout".into());
        assert!(!t.is_usable(Utc::now()));
    }
}
