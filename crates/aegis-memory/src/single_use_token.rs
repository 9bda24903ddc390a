//! In-memory implementation of [`SingleUseTokenRepository`].

use std::collections::HashMap;
use std::sync::Arc;

use aegis_core::error::{AegisError, AegisResult};
use aegis_core::models::single_use_token::{CreateSingleUseToken, SingleUseToken, TokenPurpose};
use aegis_core::repository::SingleUseTokenRepository;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct MemorySingleUseTokenRepository {
    tokens: Arc<RwLock<HashMap<String, SingleUseToken>>>,
}

impl MemorySingleUseTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SingleUseTokenRepository for MemorySingleUseTokenRepository {
    async fn create(&self, input: CreateSingleUseToken) -> AegisResult<SingleUseToken> {
        let token = SingleUseToken {
            token_hash: input.token_hash.clone(),
            user_id: input.user_id,
            purpose: input.purpose,
            expires_at: input.expires_at,
            consumed_at: None,
            created_at: Utc::now(),
        };
        self.tokens
            .write()
            .await
            .insert(input.token_hash, token.clone());
        Ok(token)
    }

    async fn get_by_token_hash(
        &self,
        purpose: TokenPurpose,
        token_hash: &str,
    ) -> AegisResult<SingleUseToken> {
        self.tokens
            .read()
            .await
            .get(token_hash)
            .filter(|t| t.purpose == purpose)
            .cloned()
            .ok_or_else(|| AegisError::NotFound {
                entity: "single_use_token".into(),
                key: token_hash.to_string(),
            })
    }

    async fn mark_consumed(&self, token_hash: &str, now: DateTime<Utc>) -> AegisResult<bool> {
        let mut tokens = self.tokens.write().await;
        let token = tokens
            .get_mut(token_hash)
            .ok_or_else(|| AegisError::NotFound {
                entity: "single_use_token".into(),
                key: token_hash.to_string(),
            })?;

        if token.consumed_at.is_some() {
            return Ok(false);
        }
        token.consumed_at = Some(now);
        Ok(true)
    }

    async fn release(&self, token_hash: &str) -> AegisResult<bool> {
        let mut tokens = self.tokens.write().await;
        let token = tokens
            .get_mut(token_hash)
            .ok_or_else(|| AegisError::NotFound {
                entity: "single_use_token".into(),
                key: token_hash.to_string(),
            })?;

        if token.consumed_at.is_none() {
            return Ok(false);
        }
        token.consumed_at = None;
        Ok(true)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AegisResult<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}
