//! Contract tests for the in-memory repositories, with emphasis on the
//! compare-and-swap operations the engine depends on.

use aegis_core::error::AegisError;
use aegis_core::models::refresh_token::CreateRefreshToken;
use aegis_core::models::single_use_token::{CreateSingleUseToken, TokenPurpose};
use aegis_core::models::user::{CreateUser, UpdateUser};
use aegis_core::repository::{RefreshTokenRepository, SingleUseTokenRepository, UserRepository};
use aegis_memory::{MemoryRefreshTokenRepository, MemorySingleUseTokenRepository, MemoryUserRepository};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn create_user_input(email: &str, username: &str) -> CreateUser {
    CreateUser {
        email: email.into(),
        username: username.into(),
        password_hash: "$argon2id$stub".into(),
    }
}

#[tokio::test]
async fn user_create_and_lookup() {
    let repo = MemoryUserRepository::new();
    let user = repo
        .create(create_user_input("alice@example.com", "alice"))
        .await
        .unwrap();

    assert!(!user.email_verified);
    assert!(!user.mfa_enabled);

    let by_id = repo.get_by_id(user.id).await.unwrap();
    assert_eq!(by_id.email, "alice@example.com");

    let by_email = repo.get_by_email("alice@example.com").await.unwrap();
    assert_eq!(by_email.id, user.id);

    assert!(repo.exists_by_email("alice@example.com").await.unwrap());
    assert!(repo.exists_by_username("alice").await.unwrap());
    assert!(!repo.exists_by_email("bob@example.com").await.unwrap());
}

#[tokio::test]
async fn user_duplicate_email_rejected() {
    let repo = MemoryUserRepository::new();
    repo.create(create_user_input("alice@example.com", "alice"))
        .await
        .unwrap();

    let err = repo
        .create(create_user_input("alice@example.com", "alice2"))
        .await
        .unwrap_err();
    match err {
        AegisError::AlreadyExists { entity } => assert!(entity.contains("email")),
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

#[tokio::test]
async fn user_duplicate_username_rejected() {
    let repo = MemoryUserRepository::new();
    repo.create(create_user_input("alice@example.com", "alice"))
        .await
        .unwrap();

    let err = repo
        .create(create_user_input("alice2@example.com", "alice"))
        .await
        .unwrap_err();
    match err {
        AegisError::AlreadyExists { entity } => assert!(entity.contains("username")),
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

#[tokio::test]
async fn user_update_nullable_fields() {
    let repo = MemoryUserRepository::new();
    let user = repo
        .create(create_user_input("alice@example.com", "alice"))
        .await
        .unwrap();

    let now = Utc::now();
    let updated = repo
        .update(
            user.id,
            UpdateUser {
                mfa_enabled: Some(true),
                mfa_secret: Some(Some("sealed".into())),
                last_login_at: Some(Some(now)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.mfa_enabled);
    assert_eq!(updated.mfa_secret.as_deref(), Some("sealed"));
    assert_eq!(updated.last_login_at, Some(now));

    // Some(None) clears; None leaves untouched.
    let cleared = repo
        .update(
            user.id,
            UpdateUser {
                mfa_secret: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.mfa_secret.is_none());
    assert!(cleared.mfa_enabled);
}

#[tokio::test]
async fn update_unknown_user_is_not_found() {
    let repo = MemoryUserRepository::new();
    let err = repo
        .update(Uuid::new_v4(), UpdateUser::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AegisError::NotFound { .. }));
}

#[tokio::test]
async fn backup_code_consumed_exactly_once() {
    let repo = MemoryUserRepository::new();
    let user = repo
        .create(create_user_input("alice@example.com", "alice"))
        .await
        .unwrap();
    repo.update(
        user.id,
        UpdateUser {
            mfa_backup_codes: Some(Some(vec!["hash-a".into(), "hash-b".into()])),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(repo.consume_backup_code(user.id, "hash-a").await.unwrap());
    assert!(!repo.consume_backup_code(user.id, "hash-a").await.unwrap());
    // The other code is untouched.
    assert!(repo.consume_backup_code(user.id, "hash-b").await.unwrap());
}

#[tokio::test]
async fn backup_code_race_has_single_winner() {
    let repo = MemoryUserRepository::new();
    let user = repo
        .create(create_user_input("alice@example.com", "alice"))
        .await
        .unwrap();
    repo.update(
        user.id,
        UpdateUser {
            mfa_backup_codes: Some(Some(vec!["hash-a".into()])),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let r1 = repo.clone();
    let r2 = repo.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { r1.consume_backup_code(user.id, "hash-a").await.unwrap() }),
        tokio::spawn(async move { r2.consume_backup_code(user.id, "hash-a").await.unwrap() }),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a ^ b, "exactly one consumer must win, got {a} and {b}");
}

#[tokio::test]
async fn refresh_revoke_is_compare_and_swap() {
    let repo = MemoryRefreshTokenRepository::new();
    let user_id = Uuid::new_v4();
    repo.create(CreateRefreshToken {
        token_hash: "h1".into(),
        user_id,
        expires_at: Utc::now() + Duration::days(7),
    })
    .await
    .unwrap();

    let now = Utc::now();
    assert!(repo.revoke("h1", now, "refresh").await.unwrap());
    // Second transition loses.
    assert!(!repo.revoke("h1", now, "revoke_all").await.unwrap());

    let stored = repo.get_by_token_hash("h1").await.unwrap();
    assert_eq!(stored.revoked_by.as_deref(), Some("refresh"));

    let err = repo.revoke("missing", now, "logout").await.unwrap_err();
    assert!(matches!(err, AegisError::NotFound { .. }));
}

#[tokio::test]
async fn revoke_all_skips_already_revoked() {
    let repo = MemoryRefreshTokenRepository::new();
    let user_id = Uuid::new_v4();
    for hash in ["h1", "h2", "h3"] {
        repo.create(CreateRefreshToken {
            token_hash: hash.into(),
            user_id,
            expires_at: Utc::now() + Duration::days(7),
        })
        .await
        .unwrap();
    }
    // A token owned by someone else must be untouched.
    repo.create(CreateRefreshToken {
        token_hash: "other".into(),
        user_id: Uuid::new_v4(),
        expires_at: Utc::now() + Duration::days(7),
    })
    .await
    .unwrap();

    let now = Utc::now();
    repo.revoke("h1", now, "logout").await.unwrap();

    let revoked = repo.revoke_all_for_user(user_id, now, "revoke_all").await.unwrap();
    assert_eq!(revoked, 2);

    assert!(repo.get_by_token_hash("other").await.unwrap().revoked_at.is_none());
    assert_eq!(
        repo.get_by_token_hash("h1").await.unwrap().revoked_by.as_deref(),
        Some("logout")
    );
}

#[tokio::test]
async fn refresh_delete_expired_only_removes_expired() {
    let repo = MemoryRefreshTokenRepository::new();
    let user_id = Uuid::new_v4();
    repo.create(CreateRefreshToken {
        token_hash: "live".into(),
        user_id,
        expires_at: Utc::now() + Duration::days(7),
    })
    .await
    .unwrap();
    repo.create(CreateRefreshToken {
        token_hash: "dead".into(),
        user_id,
        expires_at: Utc::now() - Duration::seconds(1),
    })
    .await
    .unwrap();

    assert_eq!(repo.delete_expired(Utc::now()).await.unwrap(), 1);
    assert!(repo.get_by_token_hash("live").await.is_ok());
    assert!(repo.get_by_token_hash("dead").await.is_err());
}

#[tokio::test]
async fn single_use_purpose_namespaces_are_separate() {
    let repo = MemorySingleUseTokenRepository::new();
    repo.create(CreateSingleUseToken {
        token_hash: "h1".into(),
        user_id: Uuid::new_v4(),
        purpose: TokenPurpose::EmailVerification,
        expires_at: Utc::now() + Duration::hours(1),
    })
    .await
    .unwrap();

    assert!(
        repo.get_by_token_hash(TokenPurpose::EmailVerification, "h1")
            .await
            .is_ok()
    );
    let err = repo
        .get_by_token_hash(TokenPurpose::PasswordReset, "h1")
        .await
        .unwrap_err();
    assert!(matches!(err, AegisError::NotFound { .. }));
}

#[tokio::test]
async fn single_use_mark_consumed_single_winner() {
    let repo = MemorySingleUseTokenRepository::new();
    repo.create(CreateSingleUseToken {
        token_hash: "h1".into(),
        user_id: Uuid::new_v4(),
        purpose: TokenPurpose::PasswordReset,
        expires_at: Utc::now() + Duration::hours(1),
    })
    .await
    .unwrap();

    let r1 = repo.clone();
    let r2 = repo.clone();
    let now = Utc::now();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { r1.mark_consumed("h1", now).await.unwrap() }),
        tokio::spawn(async move { r2.mark_consumed("h1", now).await.unwrap() }),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a ^ b, "exactly one consumer must win, got {a} and {b}");
}

#[tokio::test]
async fn single_use_release_returns_token_to_usable() {
    let repo = MemorySingleUseTokenRepository::new();
    repo.create(CreateSingleUseToken {
        token_hash: "h1".into(),
        user_id: Uuid::new_v4(),
        purpose: TokenPurpose::EmailVerification,
        expires_at: Utc::now() + Duration::hours(1),
    })
    .await
    .unwrap();

    let now = Utc::now();
    assert!(repo.mark_consumed("h1", now).await.unwrap());
    assert!(repo.release("h1").await.unwrap());

    // Releasing an unconsumed token is a no-op.
    assert!(!repo.release("h1").await.unwrap());

    // The released token can be reserved again.
    assert!(repo.mark_consumed("h1", now).await.unwrap());

    let err = repo.release("missing").await.unwrap_err();
    assert!(matches!(err, AegisError::NotFound { .. }));
}
