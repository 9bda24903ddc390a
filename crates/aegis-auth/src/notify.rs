//! Notification queue hand-off.
//!
//! The engine pushes [`Notification`]s onto an unbounded channel and
//! returns immediately; a [`NotificationWorker`] drains the channel through
//! a [`Mailer`]. Delivery failures are logged and dropped — they must never
//! roll back the state change that produced the notification.

use aegis_core::notify::{Notification, NotificationSink};
use tokio::sync::mpsc;

/// Outbound transport boundary. Real SMTP lives behind this trait,
/// elsewhere.
pub trait Mailer: Send + Sync {
    fn deliver(&self, notification: &Notification)
    -> impl Future<Output = Result<(), String>> + Send;
}

/// A mailer that only records deliveries in the log. Useful for local
/// development and environments without outbound email.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMailer;

impl Mailer for TracingMailer {
    async fn deliver(&self, notification: &Notification) -> Result<(), String> {
        match notification {
            Notification::Welcome { email, .. } => {
                tracing::info!(%email, "welcome notification");
            }
            Notification::EmailVerification { email, .. } => {
                tracing::info!(%email, "email verification notification");
            }
            Notification::PasswordReset { email, .. } => {
                tracing::info!(%email, "password reset notification");
            }
            Notification::MfaBackupCodes { email, codes, .. } => {
                tracing::info!(%email, count = codes.len(), "backup codes notification");
            }
        }
        Ok(())
    }
}

/// Sending half: a non-blocking [`NotificationSink`] backed by the queue.
#[derive(Debug, Clone)]
pub struct QueueSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationSink for QueueSink {
    fn send(&self, notification: Notification) {
        // Fails only when the worker is gone; the flow must not care.
        if self.tx.send(notification).is_err() {
            tracing::warn!("notification dropped: worker not running");
        }
    }
}

/// Draining half: run on a background task, independent of request latency.
pub struct NotificationWorker {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl NotificationWorker {
    /// Drain the queue until every sender is dropped.
    pub async fn run<M: Mailer>(mut self, mailer: M) {
        while let Some(notification) = self.rx.recv().await {
            if let Err(reason) = mailer.deliver(&notification).await {
                tracing::warn!(%reason, "notification delivery failed");
            }
        }
    }

    /// Receive the next queued notification. Test hook.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Non-blocking receive. Test hook.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

/// Create a connected sink/worker pair.
pub fn queue() -> (QueueSink, NotificationWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueSink { tx }, NotificationWorker { rx })
}
