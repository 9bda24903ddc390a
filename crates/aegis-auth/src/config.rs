//! Authentication configuration.

/// Configuration for the credential lifecycle engine.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 604_800 = 7 days).
    pub refresh_token_lifetime_secs: u64,
    /// Email-verification token validity window in seconds (default: 3600).
    pub email_verification_lifetime_secs: u64,
    /// Password-reset token validity window in seconds (default: 3600).
    pub password_reset_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// 256-bit AES-GCM key for sealing TOTP secrets at rest. `None` stores
    /// the base32 secret as-is.
    pub mfa_encryption_key: Option<[u8; 32]>,
    /// Issuer name shown in authenticator apps.
    pub totp_issuer: String,
    /// Number of backup codes generated at MFA enrollment (default: 10).
    pub backup_code_count: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            jwt_issuer: "aegis".into(),
            access_token_lifetime_secs: 900,
            refresh_token_lifetime_secs: 604_800,
            email_verification_lifetime_secs: 3600,
            password_reset_lifetime_secs: 3600,
            pepper: None,
            min_password_length: 8,
            mfa_encryption_key: None,
            totp_issuer: "AEGIS".into(),
            backup_code_count: 10,
        }
    }
}
