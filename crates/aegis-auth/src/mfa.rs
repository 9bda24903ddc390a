//! MFA enrollment lifecycle and backup-code consumption.
//!
//! State machine: `Unset → PendingVerification → Enabled → Disabled`.
//! `begin_enrollment` generates a secret but persists nothing; only
//! `confirm_enrollment`, gated on a TOTP proof for that secret, writes MFA
//! state. Turning MFA off re-proves device possession (TOTP code or a
//! remaining backup code) — email and password alone never suffice.

use aegis_core::models::user::{UpdateUser, User};
use aegis_core::notify::{Notification, NotificationSink};
use aegis_core::repository::UserRepository;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::totp::{self, TotpEnrollment};

/// Verify a 6-digit TOTP code against a user's stored (sealed) secret.
///
/// `Ok(false)` for a wrong code; `MfaNotEnrolled` if the user has no
/// secret.
pub fn verify_totp_for_user(user: &User, code: &str, config: &AuthConfig) -> AuthResult<bool> {
    let stored = user.mfa_secret.as_deref().ok_or(AuthError::MfaNotEnrolled)?;
    let secret = totp::open_secret(config.mfa_encryption_key.as_ref(), stored)?;
    totp::verify_code(&secret, code, &config.totp_issuer, &user.email)
}

pub struct MfaService<U, N> {
    user_repo: U,
    notifier: N,
    config: AuthConfig,
}

impl<U: UserRepository, N: NotificationSink> MfaService<U, N> {
    pub fn new(user_repo: U, notifier: N, config: AuthConfig) -> Self {
        Self {
            user_repo,
            notifier,
            config,
        }
    }

    /// Start enrollment: generate a fresh secret and otpauth URI for the
    /// user to scan. Nothing is persisted until [`Self::confirm_enrollment`].
    pub async fn begin_enrollment(&self, user_id: Uuid) -> AuthResult<TotpEnrollment> {
        let user = self.user_repo.get_by_id(user_id).await?;
        totp::generate_enrollment(&self.config.totp_issuer, &user.email)
    }

    /// Complete enrollment: prove possession of the device with a current
    /// code for `secret`, then persist the sealed secret, hashed backup
    /// codes, and the enabled flag.
    ///
    /// Returns the raw backup codes — this is the only time they exist in
    /// presentable form.
    pub async fn confirm_enrollment(
        &self,
        user_id: Uuid,
        secret: &str,
        code: &str,
    ) -> AuthResult<Vec<String>> {
        let user = self.user_repo.get_by_id(user_id).await?;

        if !totp::verify_code(secret, code, &self.config.totp_issuer, &user.email)? {
            return Err(AuthError::InvalidMfaCode);
        }

        let sealed = totp::seal_secret(self.config.mfa_encryption_key.as_ref(), secret)?;
        let codes = totp::generate_backup_codes(self.config.backup_code_count);
        let code_hashes: Vec<String> = codes.iter().map(|c| totp::hash_backup_code(c)).collect();

        self.user_repo
            .update(
                user_id,
                UpdateUser {
                    mfa_enabled: Some(true),
                    mfa_secret: Some(Some(sealed)),
                    mfa_backup_codes: Some(Some(code_hashes)),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(%user_id, "MFA enabled");
        self.notifier.send(Notification::MfaBackupCodes {
            email: user.email,
            username: user.username,
            codes: codes.clone(),
        });

        Ok(codes)
    }

    /// Disable MFA. Requires a current TOTP code or, failing that, an
    /// unused backup code (which is consumed either way).
    pub async fn disable(&self, user_id: Uuid, code: &str) -> AuthResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;
        if !user.mfa_enabled {
            return Err(AuthError::MfaNotEnrolled);
        }

        if !verify_totp_for_user(&user, code, &self.config)? {
            let hash = totp::hash_backup_code(code);
            if !self.user_repo.consume_backup_code(user_id, &hash).await? {
                return Err(AuthError::InvalidMfaCode);
            }
        }

        self.user_repo
            .update(
                user_id,
                UpdateUser {
                    mfa_enabled: Some(false),
                    mfa_secret: Some(None),
                    mfa_backup_codes: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(%user_id, "MFA disabled");
        Ok(())
    }

    /// Spend a backup code (MFA recovery). At most one of any set of
    /// concurrent presentations of the same code succeeds.
    pub async fn consume_backup_code(&self, user_id: Uuid, code: &str) -> AuthResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;
        if !user.mfa_enabled {
            return Err(AuthError::MfaNotEnrolled);
        }

        let hash = totp::hash_backup_code(code);
        if !self.user_repo.consume_backup_code(user_id, &hash).await? {
            return Err(AuthError::InvalidBackupCode);
        }
        Ok(())
    }

    /// How many backup codes the user has left.
    pub async fn remaining_backup_codes(&self, user_id: Uuid) -> AuthResult<usize> {
        let user = self.user_repo.get_by_id(user_id).await?;
        if !user.mfa_enabled {
            return Err(AuthError::MfaNotEnrolled);
        }
        Ok(user.mfa_backup_codes.map_or(0, |codes| codes.len()))
    }
}
