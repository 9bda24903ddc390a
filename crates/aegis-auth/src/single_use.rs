//! Generic single-use token flow.
//!
//! One issuance/consumption pattern serves email verification and password
//! reset. Issuance returns the raw value for out-of-band dispatch; this
//! module never sends anything itself. Consumption is split into a usability
//! check, a compare-and-swap `mark_consumed` that reserves the token with a
//! single-winner guarantee, and a compensating `release` that backs the
//! reservation out when the write it guarded fails.

use aegis_core::clock::Clock;
use aegis_core::error::AegisError;
use aegis_core::models::single_use_token::{CreateSingleUseToken, SingleUseToken, TokenPurpose};
use aegis_core::repository::SingleUseTokenRepository;
use chrono::Duration;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::token;

pub struct SingleUseTokenFlow<T, C> {
    repo: T,
    clock: C,
}

impl<T: SingleUseTokenRepository, C: Clock> SingleUseTokenFlow<T, C> {
    pub fn new(repo: T, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Create a token for a user with the given validity window; returns
    /// the raw value for the caller to dispatch.
    pub async fn issue(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
        window_secs: u64,
    ) -> AuthResult<String> {
        let raw = token::generate_opaque_token();
        let expires_at = self.clock.now() + Duration::seconds(window_secs as i64);

        self.repo
            .create(CreateSingleUseToken {
                token_hash: token::hash_token(&raw),
                user_id,
                purpose,
                expires_at,
            })
            .await?;

        Ok(raw)
    }

    /// Look up a presented token and check it is still usable.
    ///
    /// Absent (or wrong-purpose) → `InvalidToken`; past expiry →
    /// `TokenExpiredOrRevoked`; already consumed → `TokenAlreadyUsed`.
    /// Expiry is checked before consumption so an expired token reports
    /// expiry regardless of its consumption history.
    pub async fn lookup_usable(
        &self,
        raw_token: &str,
        purpose: TokenPurpose,
    ) -> AuthResult<SingleUseToken> {
        let token_hash = token::hash_token(raw_token);
        let stored = self
            .repo
            .get_by_token_hash(purpose, &token_hash)
            .await
            .map_err(|e| match e {
                AegisError::NotFound { .. } => AuthError::InvalidToken,
                other => other.into(),
            })?;

        if stored.is_expired(self.clock.now()) {
            return Err(AuthError::TokenExpiredOrRevoked);
        }
        if stored.is_consumed() {
            return Err(AuthError::TokenAlreadyUsed);
        }
        Ok(stored)
    }

    /// Reserve a token: transition it to consumed iff nobody else has.
    ///
    /// A lost race surfaces as `TokenAlreadyUsed`.
    pub async fn mark_consumed(&self, stored: &SingleUseToken) -> AuthResult<()> {
        let transitioned = self
            .repo
            .mark_consumed(&stored.token_hash, self.clock.now())
            .await?;
        if !transitioned {
            return Err(AuthError::TokenAlreadyUsed);
        }
        Ok(())
    }

    /// Back out a reservation: return a consumed token to usable so the
    /// caller can retry after the write it guarded failed.
    pub async fn release(&self, stored: &SingleUseToken) -> AuthResult<()> {
        self.repo.release(&stored.token_hash).await?;
        Ok(())
    }

    /// Housekeeping: drop tokens past their natural expiry.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        Ok(self.repo.delete_expired(self.clock.now()).await?)
    }
}
