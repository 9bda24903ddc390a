//! In-memory implementation of [`UserRepository`].

use std::collections::HashMap;
use std::sync::Arc;

use aegis_core::error::{AegisError, AegisResult};
use aegis_core::models::user::{CreateUser, UpdateUser, User};
use aegis_core::repository::UserRepository;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for MemoryUserRepository {
    async fn create(&self, input: CreateUser) -> AegisResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == input.email) {
            return Err(AegisError::AlreadyExists {
                entity: "user email".into(),
            });
        }
        if users.values().any(|u| u.username == input.username) {
            return Err(AegisError::AlreadyExists {
                entity: "user username".into(),
            });
        }

        let user = User {
            id: Uuid::new_v4(),
            email: input.email,
            username: input.username,
            password_hash: input.password_hash,
            email_verified: false,
            email_verified_at: None,
            last_login_at: None,
            mfa_enabled: false,
            mfa_secret: None,
            mfa_backup_codes: None,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> AegisResult<User> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AegisError::NotFound {
                entity: "user".into(),
                key: id.to_string(),
            })
    }

    async fn get_by_email(&self, email: &str) -> AegisResult<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| AegisError::NotFound {
                entity: "user".into(),
                key: format!("email={email}"),
            })
    }

    async fn exists_by_email(&self, email: &str) -> AegisResult<bool> {
        Ok(self.users.read().await.values().any(|u| u.email == email))
    }

    async fn exists_by_username(&self, username: &str) -> AegisResult<bool> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|u| u.username == username))
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> AegisResult<User> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or_else(|| AegisError::NotFound {
            entity: "user".into(),
            key: id.to_string(),
        })?;

        if let Some(password_hash) = input.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(email_verified) = input.email_verified {
            user.email_verified = email_verified;
        }
        if let Some(email_verified_at) = input.email_verified_at {
            user.email_verified_at = email_verified_at;
        }
        if let Some(last_login_at) = input.last_login_at {
            user.last_login_at = last_login_at;
        }
        if let Some(mfa_enabled) = input.mfa_enabled {
            user.mfa_enabled = mfa_enabled;
        }
        if let Some(mfa_secret) = input.mfa_secret {
            user.mfa_secret = mfa_secret;
        }
        if let Some(mfa_backup_codes) = input.mfa_backup_codes {
            user.mfa_backup_codes = mfa_backup_codes;
        }

        Ok(user.clone())
    }

    async fn consume_backup_code(&self, id: Uuid, code_hash: &str) -> AegisResult<bool> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or_else(|| AegisError::NotFound {
            entity: "user".into(),
            key: id.to_string(),
        })?;

        // Check-and-remove under the write lock: one winner per code.
        let Some(codes) = user.mfa_backup_codes.as_mut() else {
            return Ok(false);
        };
        match codes.iter().position(|c| c == code_hash) {
            Some(idx) => {
                codes.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
