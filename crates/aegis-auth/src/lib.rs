//! AEGIS Auth — credential and token lifecycle engine: password
//! authentication, JWT issuance/validation, refresh-token rotation,
//! single-use tokens, and MFA (TOTP + backup codes).

pub mod config;
pub mod error;
pub mod mfa;
pub mod notify;
pub mod password;
pub mod refresh;
pub mod service;
pub mod single_use;
pub mod token;
pub mod totp;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use mfa::MfaService;
pub use refresh::RefreshTokenStore;
pub use service::{AuthService, LoginInput, LoginOutcome, SessionTokens, SignupInput, UserProfile};
pub use single_use::SingleUseTokenFlow;
pub use token::{AccessTokenClaims, ValidatedClaims};
