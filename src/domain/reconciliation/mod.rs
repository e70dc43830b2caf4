//! Reconciliation module - pure comparison of billing and store state.
//!
//! Nothing here performs I/O. `detect` and `plan` are total functions; the
//! application layer loads snapshots and applies the plan.

mod discrepancy;
mod planner;
mod report;
mod snapshot;

pub use discrepancy::{detect, DiscrepancyTag, DATE_TOLERANCE_DAYS};
pub use planner::{plan, ReconciliationPlan};
pub use report::{ReconciliationReport, ReconciliationResult, ReconciliationStep};
pub use snapshot::{ProviderSnapshot, StoreSnapshot};
