//! Named monotonic counters.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Counter used for membership numbers.
pub const MEMBERSHIP_NUMBER_COUNTER: &str = "membership_number";

/// Atomic increment-and-read counters.
///
/// Implementations must never return the same value twice for a name, even
/// under concurrent callers, and must not cache values in process.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increments the counter (creating it at zero) and returns the new value.
    async fn increment(&self, name: &str) -> Result<i64, DomainError>;
}
