//! External collaborator contracts consumed by the checkout core.

pub mod audit;
pub mod notification;

pub use audit::{AuditEntry, AuditError, AuditLog, InMemoryAuditLog, LogAuditLog};
pub use notification::{InMemoryNotifier, LogNotifier, NotificationError, Notifier, SentMessage};
