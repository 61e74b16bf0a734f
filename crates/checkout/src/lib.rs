//! Checkout orchestration for the storefront.
//!
//! Sequences a checkout request end to end: draft validation, server-side
//! pricing, the store's atomic stock-decrement-and-insert transaction, and
//! post-commit side effects through collaborator traits. Also hosts the
//! payment reconciliation engine that ties orders to mobile-money attempts.

pub mod error;
pub mod orders;
pub mod reconcile;
pub mod services;

pub use error::{CheckoutError, Result};
pub use orders::OrderService;
pub use reconcile::{
    ReconcileOutcome, ReconcilePolicy, Reconciler, WebhookDisposition, WebhookNotice,
};
pub use services::{
    AuditEntry, AuditError, AuditLog, InMemoryAuditLog, InMemoryNotifier, LogAuditLog,
    LogNotifier, NotificationError, Notifier, SentMessage,
};
