//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and must be safe under concurrent
//! invocation. Absence is surfaced explicitly as [`AegisError::NotFound`] —
//! no call is a source of silent data loss. The compare-and-swap operations
//! (`revoke`, `mark_consumed`, `consume_backup_code`) are the isolation
//! points the engine relies on: each succeeds for at most one of any set of
//! racing callers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AegisResult;
use crate::models::{
    refresh_token::{CreateRefreshToken, RefreshToken},
    single_use_token::{CreateSingleUseToken, SingleUseToken, TokenPurpose},
    user::{CreateUser, UpdateUser, User},
};

pub trait UserRepository: Send + Sync {
    /// Create a user. Fails with `AlreadyExists` on a duplicate email or
    /// username.
    fn create(&self, input: CreateUser) -> impl Future<Output = AegisResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = AegisResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = AegisResult<User>> + Send;
    fn exists_by_email(&self, email: &str) -> impl Future<Output = AegisResult<bool>> + Send;
    fn exists_by_username(&self, username: &str) -> impl Future<Output = AegisResult<bool>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = AegisResult<User>> + Send;

    /// Atomically remove `code_hash` from the user's backup-code set.
    ///
    /// Returns `true` iff the hash was present and has been removed. Under
    /// concurrent presentation of the same code, at most one caller
    /// receives `true`.
    fn consume_backup_code(
        &self,
        id: Uuid,
        code_hash: &str,
    ) -> impl Future<Output = AegisResult<bool>> + Send;
}

pub trait RefreshTokenRepository: Send + Sync {
    fn create(
        &self,
        input: CreateRefreshToken,
    ) -> impl Future<Output = AegisResult<RefreshToken>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = AegisResult<RefreshToken>> + Send;

    /// Mark a token revoked iff it is not already revoked.
    ///
    /// Returns `true` on the transition, `false` if the token was already
    /// revoked (a rotation racing a revoke-all resolves here). Fails with
    /// `NotFound` for an unknown hash.
    fn revoke(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        reason: &str,
    ) -> impl Future<Output = AegisResult<bool>> + Send;

    /// Revoke every currently-unrevoked token for the user; returns the
    /// number of tokens transitioned.
    fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        reason: &str,
    ) -> impl Future<Output = AegisResult<u64>> + Send;

    /// Housekeeping: remove tokens past their natural expiry.
    fn delete_expired(&self, now: DateTime<Utc>)
    -> impl Future<Output = AegisResult<u64>> + Send;
}

pub trait SingleUseTokenRepository: Send + Sync {
    fn create(
        &self,
        input: CreateSingleUseToken,
    ) -> impl Future<Output = AegisResult<SingleUseToken>> + Send;

    /// Look up a token by hash within one purpose namespace. A hash stored
    /// under a different purpose is `NotFound`.
    fn get_by_token_hash(
        &self,
        purpose: TokenPurpose,
        token_hash: &str,
    ) -> impl Future<Output = AegisResult<SingleUseToken>> + Send;

    /// Mark a token consumed iff it is not already consumed.
    ///
    /// Returns `true` on the transition, `false` if another caller got
    /// there first. Fails with `NotFound` for an unknown hash.
    fn mark_consumed(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = AegisResult<bool>> + Send;

    /// Clear the consumed marker iff the token is currently consumed.
    ///
    /// The compensating inverse of [`Self::mark_consumed`]: the engine
    /// reserves a token before applying the write it guards, and backs
    /// the reservation out if that write fails so a retry can succeed.
    /// Returns `true` on the transition, `false` if the token was not
    /// consumed. Fails with `NotFound` for an unknown hash.
    fn release(&self, token_hash: &str) -> impl Future<Output = AegisResult<bool>> + Send;

    /// Housekeeping: remove tokens past their natural expiry.
    fn delete_expired(&self, now: DateTime<Utc>)
    -> impl Future<Output = AegisResult<u64>> + Send;
}
