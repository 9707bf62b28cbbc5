//! Outbound notifications (new inquiries and the like).

use async_trait::async_trait;
use serde::Serialize;

use super::StoreError;

/// A notification about an accepted submission. All fields are sanitized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: &'static str,
    pub subject: String,
    pub reply_to: Option<String>,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), StoreError>;
}

/// Emits notifications as structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), StoreError> {
        tracing::info!(
            kind = notification.kind,
            subject = %notification.subject,
            reply_to = ?notification.reply_to,
            body_len = notification.body.len(),
            "Notification dispatched"
        );
        Ok(())
    }
}
