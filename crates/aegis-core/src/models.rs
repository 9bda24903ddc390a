//! Domain models for AEGIS.
//!
//! These are the core types shared across all crates.

pub mod refresh_token;
pub mod single_use_token;
pub mod user;
