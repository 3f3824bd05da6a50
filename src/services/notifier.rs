//! Fire-and-forget notification sink.
//!
//! The scheduler informs users about booking events through this
//! abstraction. Delivery (push, e-mail, websocket fan-out) lives behind the
//! trait; a failed delivery is logged and swallowed, never surfaced to the
//! operation that triggered it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::api::UserId;

/// Event types emitted by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AppointmentBooked,
    AppointmentConfirmed,
    AppointmentRejected,
    AppointmentCanceled,
}

/// A single notification addressed to one user.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Delivery deduplication key.
    pub id: Uuid,
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(recipient: UserId, kind: NotificationKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient,
            kind,
            payload,
            created_at: Utc::now(),
        }
    }
}

/// Abstract delivery channel.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification. Errors are the implementation's own;
    /// callers treat them as non-fatal.
    async fn notify(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Sink that writes notifications to the application log. The default for
/// local development, where no push gateway is wired up.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        log::info!(
            "notify user={} kind={:?} payload={}",
            notification.recipient,
            notification.kind,
            notification.payload
        );
        Ok(())
    }
}
