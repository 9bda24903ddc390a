//! Authentication error types.
//!
//! Every variant except `Crypto` and `Store` is a recoverable,
//! caller-visible outcome — the orchestrator never treats them as fatal.
//! Infrastructure failures from the repository layer pass through the
//! transparent `Store` variant without being retried here.

use aegis_core::error::AegisError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password — deliberately indistinguishable so
    /// that login cannot be used to probe for account existence.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid MFA code")]
    InvalidMfaCode,

    #[error("invalid backup code")]
    InvalidBackupCode,

    #[error("MFA is not enrolled for this user")]
    MfaNotEnrolled,

    /// Token not found, or found under a different purpose.
    #[error("invalid token")]
    InvalidToken,

    #[error("token expired or revoked")]
    TokenExpiredOrRevoked,

    #[error("token already used")]
    TokenAlreadyUsed,

    #[error("{field} already registered")]
    DuplicateAccount { field: &'static str },

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error(transparent)]
    Store(#[from] AegisError),
}

pub type AuthResult<T> = Result<T, AuthError>;
