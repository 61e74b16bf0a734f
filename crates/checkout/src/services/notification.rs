//! Notification collaborator trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

/// Error returned by a failed notification dispatch.
///
/// Callers log these and move on; a notification failure must never fail the
/// operation that triggered it.
#[derive(Debug, Error)]
#[error("Notification failed: {0}")]
pub struct NotificationError(pub String);

/// Trait for transactional buyer notifications (receipts, confirmations).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a message to a recipient.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError>;
}

/// Notifier used when no mail transport is wired up: logs the dispatch and
/// succeeds, so checkout behaves identically with and without a mailer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), NotificationError> {
        tracing::info!(to, subject, "mailer disabled, notification logged only");
        Ok(())
    }
}

/// A message captured by the in-memory notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<SentMessage>,
    fail_on_send: bool,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail on the next send call.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns the number of messages sent.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    /// Returns all captured messages.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.read().unwrap().sent.clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_send {
            return Err(NotificationError("SMTP unavailable".to_string()));
        }

        state.sent.push(SentMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_records_message() {
        let notifier = InMemoryNotifier::new();
        notifier
            .send("buyer@example.com", "Order created", "Thanks!")
            .await
            .unwrap();

        assert_eq!(notifier.sent_count(), 1);
        assert_eq!(notifier.sent()[0].to, "buyer@example.com");
    }

    #[tokio::test]
    async fn test_fail_on_send() {
        let notifier = InMemoryNotifier::new();
        notifier.set_fail_on_send(true);

        let result = notifier.send("buyer@example.com", "x", "y").await;
        assert!(result.is_err());
        assert_eq!(notifier.sent_count(), 0);
    }
}
