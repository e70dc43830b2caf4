//! Reconciliation application services.

mod executor;
mod snapshots;

pub use executor::ReconciliationExecutor;
pub use snapshots::{primary_subscription, SnapshotLoader};
