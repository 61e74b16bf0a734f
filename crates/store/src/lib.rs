//! Persistence layer for the storefront checkout core.
//!
//! Exposes the [`Store`] repository trait plus two implementations with the
//! same guarantees: [`InMemoryStore`] for tests and the default binary, and
//! [`PostgresStore`] for production. The transactional invariants (the
//! conditional stock decrement and the at-most-once paid flip) live behind
//! this trait so callers never re-implement them.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{CartItem, PaidTransition, Store};
