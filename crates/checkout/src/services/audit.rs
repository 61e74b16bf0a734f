//! Audit-log collaborator trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;
use thiserror::Error;

/// Error returned by a failed audit write. Logged, never propagated.
#[derive(Debug, Error)]
#[error("Audit log write failed: {0}")]
pub struct AuditError(pub String);

/// Trait for the security/activity audit trail.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Records an action performed by a user.
    async fn record(&self, action: &str, user_id: UserId, details: &str) -> Result<(), AuditError>;
}

/// Audit log used when no audit sink is wired up: writes entries to the
/// structured log stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditLog;

#[async_trait]
impl AuditLog for LogAuditLog {
    async fn record(&self, action: &str, user_id: UserId, details: &str) -> Result<(), AuditError> {
        tracing::info!(action, %user_id, details, "audit entry");
        Ok(())
    }
}

/// An entry captured by the in-memory audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub action: String,
    pub user_id: UserId,
    pub details: String,
}

#[derive(Debug, Default)]
struct InMemoryAuditLogState {
    entries: Vec<AuditEntry>,
    fail_on_record: bool,
}

/// In-memory audit log for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditLog {
    state: Arc<RwLock<InMemoryAuditLogState>>,
}

impl InMemoryAuditLog {
    /// Creates a new in-memory audit log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the log to fail on the next record call.
    pub fn set_fail_on_record(&self, fail: bool) {
        self.state.write().unwrap().fail_on_record = fail;
    }

    /// Returns the number of recorded entries.
    pub fn entry_count(&self) -> usize {
        self.state.read().unwrap().entries.len()
    }

    /// Returns all recorded entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.state.read().unwrap().entries.clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, action: &str, user_id: UserId, details: &str) -> Result<(), AuditError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_record {
            return Err(AuditError("database unavailable".to_string()));
        }

        state.entries.push(AuditEntry {
            action: action.to_string(),
            user_id,
            details: details.to_string(),
        });

        Ok(())
    }
}
