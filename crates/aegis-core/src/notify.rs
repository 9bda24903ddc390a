//! Notification hand-off contract.
//!
//! The engine enqueues a [`Notification`] and returns immediately; a worker
//! owned by the caller drains the queue. Delivery is at-least-once
//! best-effort — a dropped notification must never fail or roll back the
//! flow that produced it.

/// Outbound notification kinds produced by the lifecycle engine.
///
/// Single-use token values are carried raw here because the recipient needs
/// the presentable value; they are never persisted in this form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Welcome {
        email: String,
        username: String,
    },
    EmailVerification {
        email: String,
        username: String,
        token: String,
    },
    PasswordReset {
        email: String,
        username: String,
        token: String,
    },
    MfaBackupCodes {
        email: String,
        username: String,
        codes: Vec<String>,
    },
}

/// Fire-and-forget notification sink.
///
/// `send` must not block and must not surface delivery failures to the
/// caller.
pub trait NotificationSink: Send + Sync {
    fn send(&self, notification: Notification);
}
