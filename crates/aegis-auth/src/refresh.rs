//! Refresh token store — issuance, rotation, and revocation.
//!
//! Rotation enforces a reuse-detection discipline: the old token is revoked
//! through a compare-and-swap before its replacement exists, so presenting
//! an already-rotated token is always a dead end, never a replay window.

use aegis_core::clock::Clock;
use aegis_core::error::AegisError;
use aegis_core::models::refresh_token::CreateRefreshToken;
use aegis_core::repository::RefreshTokenRepository;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::token;

/// Result of a successful rotation.
#[derive(Debug)]
pub struct RotatedToken {
    /// Replacement raw token (return to client, not stored).
    pub raw_token: String,
    /// Owner of the rotated lineage.
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

pub struct RefreshTokenStore<R, C> {
    repo: R,
    clock: C,
    lifetime_secs: u64,
}

impl<R: RefreshTokenRepository, C: Clock> RefreshTokenStore<R, C> {
    pub fn new(repo: R, clock: C, lifetime_secs: u64) -> Self {
        Self {
            repo,
            clock,
            lifetime_secs,
        }
    }

    /// Generate and persist a new refresh token for a user; returns the raw
    /// value. The raw value is never logged and never stored.
    pub async fn issue(&self, user_id: Uuid) -> AuthResult<String> {
        let raw = token::generate_opaque_token();
        let expires_at = self.clock.now() + Duration::seconds(self.lifetime_secs as i64);

        self.repo
            .create(CreateRefreshToken {
                token_hash: token::hash_token(&raw),
                user_id,
                expires_at,
            })
            .await?;

        Ok(raw)
    }

    /// Rotate a refresh token: revoke the presented one and issue a
    /// replacement for the same user.
    ///
    /// Fails with `InvalidToken` for an unknown value and
    /// `TokenExpiredOrRevoked` for a token past expiry, already revoked, or
    /// losing the revocation race.
    pub async fn rotate(&self, raw_token: &str) -> AuthResult<RotatedToken> {
        let token_hash = token::hash_token(raw_token);
        let stored = self
            .repo
            .get_by_token_hash(&token_hash)
            .await
            .map_err(not_found_is_invalid)?;

        let now = self.clock.now();
        if stored.is_revoked() {
            tracing::warn!(user_id = %stored.user_id, "revoked refresh token presented");
            return Err(AuthError::TokenExpiredOrRevoked);
        }
        if stored.is_expired(now) {
            return Err(AuthError::TokenExpiredOrRevoked);
        }

        // CAS: a concurrent rotation or revoke-all wins here, not below.
        let transitioned = self.repo.revoke(&token_hash, now, "refresh").await?;
        if !transitioned {
            return Err(AuthError::TokenExpiredOrRevoked);
        }

        let raw = token::generate_opaque_token();
        let expires_at = now + Duration::seconds(self.lifetime_secs as i64);
        let created = self
            .repo
            .create(CreateRefreshToken {
                token_hash: token::hash_token(&raw),
                user_id: stored.user_id,
                expires_at,
            })
            .await?;

        Ok(RotatedToken {
            raw_token: raw,
            user_id: created.user_id,
            expires_at: created.expires_at,
        })
    }

    /// Revoke a single token (logout). Best-effort: an unknown or
    /// already-revoked token is a no-op, never an error.
    pub async fn revoke(&self, raw_token: &str) -> AuthResult<()> {
        let token_hash = token::hash_token(raw_token);
        let now = self.clock.now();
        match self.repo.revoke(&token_hash, now, "logout").await {
            Ok(_) => Ok(()),
            Err(AegisError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Revoke every live token for a user (logout-everywhere, compromise
    /// response); returns the number of tokens revoked.
    pub async fn revoke_all(&self, user_id: Uuid) -> AuthResult<u64> {
        let now = self.clock.now();
        let revoked = self
            .repo
            .revoke_all_for_user(user_id, now, "revoke_all")
            .await?;
        tracing::info!(%user_id, revoked, "revoked all refresh tokens");
        Ok(revoked)
    }

    /// Housekeeping: drop tokens past their natural expiry.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        Ok(self.repo.delete_expired(self.clock.now()).await?)
    }
}

fn not_found_is_invalid(err: AegisError) -> AuthError {
    match err {
        AegisError::NotFound { .. } => AuthError::InvalidToken,
        other => other.into(),
    }
}
