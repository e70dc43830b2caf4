//! In-memory counters.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::CounterStore;

#[derive(Default)]
pub struct InMemoryCounterStore {
    counters: Mutex<HashMap<String, i64>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, name: &str) -> Result<i64, DomainError> {
        let mut counters = self.counters.lock().await;
        let value = counters.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}
