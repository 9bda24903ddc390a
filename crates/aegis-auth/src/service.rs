//! Authentication service — login, signup, refresh, and the out-of-band
//! token flows, composed over explicitly injected collaborators.

use aegis_core::clock::Clock;
use aegis_core::error::AegisError;
use aegis_core::models::single_use_token::{SingleUseToken, TokenPurpose};
use aegis_core::models::user::{CreateUser, UpdateUser, User};
use aegis_core::notify::{Notification, NotificationSink};
use aegis_core::repository::{RefreshTokenRepository, SingleUseTokenRepository, UserRepository};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::mfa;
use crate::password;
use crate::refresh::RefreshTokenStore;
use crate::single_use::SingleUseTokenFlow;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    /// 6-digit TOTP code, required once MFA is enabled.
    pub mfa_code: Option<String>,
}

/// Input for the signup flow.
#[derive(Debug)]
pub struct SignupInput {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// Caller-facing view of a user record. Never carries secrets.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub email_verified: bool,
    pub mfa_enabled: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            email_verified: user.email_verified,
            mfa_enabled: user.mfa_enabled,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// A freshly issued session: signed access token plus raw refresh token.
#[derive(Debug)]
pub struct SessionTokens {
    pub access_token: String,
    /// Raw opaque refresh token (return to client, not stored).
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserProfile,
}

/// Outcome of a login attempt that did not fail.
///
/// `MfaRequired` is an expected intermediate state, not an error: the
/// password verified but a second factor is still owed, and no tokens have
/// been issued.
#[derive(Debug)]
pub enum LoginOutcome {
    Success(SessionTokens),
    MfaRequired(UserProfile),
}

pub struct AuthService<U, R, T, N, C> {
    user_repo: U,
    refresh_tokens: RefreshTokenStore<R, C>,
    single_use: SingleUseTokenFlow<T, C>,
    notifier: N,
    clock: C,
    config: AuthConfig,
}

impl<U, R, T, N, C> AuthService<U, R, T, N, C>
where
    U: UserRepository,
    R: RefreshTokenRepository,
    T: SingleUseTokenRepository,
    N: NotificationSink,
    C: Clock + Clone,
{
    pub fn new(
        user_repo: U,
        refresh_repo: R,
        single_use_repo: T,
        notifier: N,
        clock: C,
        config: AuthConfig,
    ) -> Self {
        let refresh_tokens =
            RefreshTokenStore::new(refresh_repo, clock.clone(), config.refresh_token_lifetime_secs);
        let single_use = SingleUseTokenFlow::new(single_use_repo, clock.clone());
        Self {
            user_repo,
            refresh_tokens,
            single_use,
            notifier,
            clock,
            config,
        }
    }

    /// Authenticate with email + password (+ TOTP code once MFA is on).
    ///
    /// An unknown email and a wrong password are the same
    /// `InvalidCredentials`; an MFA code is only examined after the
    /// password has verified, so its failure is the distinct
    /// `InvalidMfaCode`. Nothing is persisted unless the whole chain
    /// succeeds.
    pub async fn login(&self, input: LoginInput) -> AuthResult<LoginOutcome> {
        let user = match self.user_repo.get_by_email(&input.email).await {
            Ok(user) => user,
            Err(AegisError::NotFound { .. }) => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };

        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        if user.mfa_enabled {
            match input.mfa_code.as_deref().filter(|c| !c.is_empty()) {
                None => return Ok(LoginOutcome::MfaRequired(UserProfile::from(&user))),
                Some(code) => {
                    if !mfa::verify_totp_for_user(&user, code, &self.config)? {
                        return Err(AuthError::InvalidMfaCode);
                    }
                }
            }
        }

        let now = self.clock.now();
        let user = self
            .user_repo
            .update(
                user.id,
                UpdateUser {
                    last_login_at: Some(Some(now)),
                    ..Default::default()
                },
            )
            .await?;

        let session = self.issue_session(&user).await?;
        tracing::info!(user_id = %user.id, "login succeeded");
        Ok(LoginOutcome::Success(session))
    }

    /// Register a new account and log it in immediately. Email
    /// verification is issued alongside but is advisory, not gating.
    pub async fn signup(&self, input: SignupInput) -> AuthResult<SessionTokens> {
        if input.password != input.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        if input.password.chars().count() < self.config.min_password_length {
            return Err(AuthError::WeakPassword {
                min: self.config.min_password_length,
            });
        }

        // Email is checked before username; the first violation is the one
        // reported.
        if self.user_repo.exists_by_email(&input.email).await? {
            return Err(AuthError::DuplicateAccount { field: "email" });
        }
        if self.user_repo.exists_by_username(&input.username).await? {
            return Err(AuthError::DuplicateAccount { field: "username" });
        }

        let password_hash =
            password::hash_password(&input.password, self.config.pepper.as_deref())?;

        let user = self
            .user_repo
            .create(CreateUser {
                email: input.email,
                username: input.username,
                password_hash,
            })
            .await
            .map_err(duplicate_account)?;

        self.send_email_verification(&user).await?;
        self.notifier.send(Notification::Welcome {
            email: user.email.clone(),
            username: user.username.clone(),
        });

        let session = self.issue_session(&user).await?;
        tracing::info!(user_id = %user.id, "signup completed");
        Ok(session)
    }

    /// Rotate a refresh token and mint a new session.
    pub async fn refresh(&self, raw_refresh_token: &str) -> AuthResult<SessionTokens> {
        let rotated = self.refresh_tokens.rotate(raw_refresh_token).await?;

        let user = match self.user_repo.get_by_id(rotated.user_id).await {
            Ok(user) => user,
            Err(AegisError::NotFound { .. }) => return Err(AuthError::InvalidToken),
            Err(e) => return Err(e.into()),
        };

        let access_token = token::issue_access_token(&user, self.clock.now(), &self.config)?;
        Ok(SessionTokens {
            access_token,
            refresh_token: rotated.raw_token,
            expires_in: self.config.access_token_lifetime_secs,
            user: UserProfile::from(&user),
        })
    }

    /// Revoke a single refresh token. Idempotent: a client retry or
    /// double-click never produces a visible error.
    pub async fn logout(&self, raw_refresh_token: &str) -> AuthResult<()> {
        self.refresh_tokens.revoke(raw_refresh_token).await
    }

    /// Logout-everywhere: revoke every live refresh token for the user.
    pub async fn revoke_all(&self, user_id: Uuid) -> AuthResult<()> {
        self.refresh_tokens.revoke_all(user_id).await?;
        Ok(())
    }

    /// Issue (or re-issue) an email-verification token and dispatch it.
    pub async fn request_email_verification(&self, email: &str) -> AuthResult<()> {
        let user = self.user_repo.get_by_email(email).await?;
        self.send_email_verification(&user).await
    }

    /// Consume an email-verification token and mark the address verified.
    /// The consumed record is retained until its natural expiry so a
    /// second presentation reports "already used" rather than "invalid".
    pub async fn confirm_email_verification(&self, raw_token: &str) -> AuthResult<()> {
        let stored = self
            .single_use
            .lookup_usable(raw_token, TokenPurpose::EmailVerification)
            .await?;

        let user = match self.user_repo.get_by_id(stored.user_id).await {
            Ok(user) => user,
            Err(AegisError::NotFound { .. }) => return Err(AuthError::InvalidToken),
            Err(e) => return Err(e.into()),
        };

        self.single_use.mark_consumed(&stored).await?;
        let update = UpdateUser {
            email_verified: Some(true),
            email_verified_at: Some(Some(self.clock.now())),
            ..Default::default()
        };
        if let Err(e) = self.user_repo.update(user.id, update).await {
            self.release_after_failure(&stored).await;
            return Err(e.into());
        }

        tracing::info!(user_id = %user.id, "email verified");
        Ok(())
    }

    /// Issue a password-reset token and dispatch it.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let user = self.user_repo.get_by_email(email).await?;
        let raw = self
            .single_use
            .issue(
                user.id,
                TokenPurpose::PasswordReset,
                self.config.password_reset_lifetime_secs,
            )
            .await?;

        self.notifier.send(Notification::PasswordReset {
            email: user.email,
            username: user.username,
            token: raw,
        });
        Ok(())
    }

    /// Consume a password-reset token and replace the stored password
    /// hash. The consumed token record is retained for audit.
    pub async fn reset_password(&self, raw_token: &str, new_password: &str) -> AuthResult<()> {
        if new_password.chars().count() < self.config.min_password_length {
            return Err(AuthError::WeakPassword {
                min: self.config.min_password_length,
            });
        }

        let stored = self
            .single_use
            .lookup_usable(raw_token, TokenPurpose::PasswordReset)
            .await?;

        let user = match self.user_repo.get_by_id(stored.user_id).await {
            Ok(user) => user,
            Err(AegisError::NotFound { .. }) => return Err(AuthError::InvalidToken),
            Err(e) => return Err(e.into()),
        };

        let password_hash = password::hash_password(new_password, self.config.pepper.as_deref())?;

        self.single_use.mark_consumed(&stored).await?;
        let update = UpdateUser {
            password_hash: Some(password_hash),
            ..Default::default()
        };
        if let Err(e) = self.user_repo.update(user.id, update).await {
            self.release_after_failure(&stored).await;
            return Err(e.into());
        }

        tracing::info!(user_id = %user.id, "password reset");
        Ok(())
    }

    /// Change password for an authenticated user; requires proof of the
    /// current password.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;

        let valid = password::verify_password(
            current_password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }
        if new_password.chars().count() < self.config.min_password_length {
            return Err(AuthError::WeakPassword {
                min: self.config.min_password_length,
            });
        }

        let password_hash = password::hash_password(new_password, self.config.pepper.as_deref())?;
        self.user_repo
            .update(
                user_id,
                UpdateUser {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    /// Housekeeping: drop refresh and single-use tokens past expiry.
    /// Expiry is enforced at read time; this only reclaims storage.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        let refresh = self.refresh_tokens.cleanup_expired().await?;
        let single_use = self.single_use.cleanup_expired().await?;
        Ok(refresh + single_use)
    }

    /// Back out a token reservation after the write it guarded failed, so
    /// the token stays presentable for a retry. The original failure is
    /// what the caller reports; a failed back-out is only logged.
    async fn release_after_failure(&self, stored: &SingleUseToken) {
        if let Err(err) = self.single_use.release(stored).await {
            tracing::error!(
                error = %err,
                purpose = ?stored.purpose,
                "failed to release single-use token"
            );
        }
    }

    async fn send_email_verification(&self, user: &User) -> AuthResult<()> {
        let raw = self
            .single_use
            .issue(
                user.id,
                TokenPurpose::EmailVerification,
                self.config.email_verification_lifetime_secs,
            )
            .await?;

        self.notifier.send(Notification::EmailVerification {
            email: user.email.clone(),
            username: user.username.clone(),
            token: raw,
        });
        Ok(())
    }

    async fn issue_session(&self, user: &User) -> AuthResult<SessionTokens> {
        let access_token = token::issue_access_token(user, self.clock.now(), &self.config)?;
        let refresh_token = self.refresh_tokens.issue(user.id).await?;
        Ok(SessionTokens {
            access_token,
            refresh_token,
            expires_in: self.config.access_token_lifetime_secs,
            user: UserProfile::from(user),
        })
    }
}

/// A uniqueness race lost at insert time reports the same way as the
/// upfront existence checks.
fn duplicate_account(err: AegisError) -> AuthError {
    match err {
        AegisError::AlreadyExists { ref entity } if entity.contains("username") => {
            AuthError::DuplicateAccount { field: "username" }
        }
        AegisError::AlreadyExists { .. } => AuthError::DuplicateAccount { field: "email" },
        other => other.into(),
    }
}
