//! Rider persistence boundary.
//!
//! The store is the single writer of a rider row. Lifecycle changes go through
//! [`RiderStore::update_if_status`], a conditional write that only succeeds when
//! the stored status still equals the caller's expected prior status; this is
//! how concurrent decisions on the same rider are serialized.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryRiderStore;
pub use postgres::PostgresRiderStore;
pub use r#trait::{RiderFilter, RiderStore, RiderStoreError};
