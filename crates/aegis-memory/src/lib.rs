//! AEGIS Memory — in-memory repository implementations.
//!
//! Reference implementations of the `aegis-core` repository contracts,
//! backed by maps behind async read/write locks. Used by integration tests
//! and local development; every compare-and-swap contract (token
//! revocation, token consumption, backup-code removal) is enforced under a
//! single write lock.

mod refresh_token;
mod single_use_token;
mod user;

pub use refresh_token::MemoryRefreshTokenRepository;
pub use single_use_token::MemorySingleUseTokenRepository;
pub use user::MemoryUserRepository;
