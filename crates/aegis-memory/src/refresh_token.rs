//! In-memory implementation of [`RefreshTokenRepository`].

use std::collections::HashMap;
use std::sync::Arc;

use aegis_core::error::{AegisError, AegisResult};
use aegis_core::models::refresh_token::{CreateRefreshToken, RefreshToken};
use aegis_core::repository::RefreshTokenRepository;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MemoryRefreshTokenRepository {
    tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
}

impl MemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefreshTokenRepository for MemoryRefreshTokenRepository {
    async fn create(&self, input: CreateRefreshToken) -> AegisResult<RefreshToken> {
        let token = RefreshToken {
            token_hash: input.token_hash.clone(),
            user_id: input.user_id,
            expires_at: input.expires_at,
            revoked_at: None,
            revoked_by: None,
            created_at: Utc::now(),
        };
        self.tokens
            .write()
            .await
            .insert(input.token_hash, token.clone());
        Ok(token)
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> AegisResult<RefreshToken> {
        self.tokens
            .read()
            .await
            .get(token_hash)
            .cloned()
            .ok_or_else(|| AegisError::NotFound {
                entity: "refresh_token".into(),
                key: token_hash.to_string(),
            })
    }

    async fn revoke(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        reason: &str,
    ) -> AegisResult<bool> {
        let mut tokens = self.tokens.write().await;
        let token = tokens
            .get_mut(token_hash)
            .ok_or_else(|| AegisError::NotFound {
                entity: "refresh_token".into(),
                key: token_hash.to_string(),
            })?;

        if token.revoked_at.is_some() {
            return Ok(false);
        }
        token.revoked_at = Some(now);
        token.revoked_by = Some(reason.to_string());
        Ok(true)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        reason: &str,
    ) -> AegisResult<u64> {
        let mut tokens = self.tokens.write().await;
        let mut revoked = 0u64;
        for token in tokens.values_mut() {
            if token.user_id == user_id && token.revoked_at.is_none() {
                token.revoked_at = Some(now);
                token.revoked_by = Some(reason.to_string());
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AegisResult<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}
