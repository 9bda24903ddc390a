//! Error types for the AEGIS system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AegisError {
    #[error("Entity not found: {entity} with key {key}")]
    NotFound { entity: String, key: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AegisResult<T> = Result<T, AegisError>;
