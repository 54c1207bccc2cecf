//! History store — recent actions per table for join backfill.
//!
//! The live protocol does not depend on history: a store that records
//! nothing still delivers every broadcast. The bundled store is in-memory
//! and bounded; a durable backend would implement the same trait.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use frames::Action;

#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append an action. Called in broadcast order for each table.
    async fn record(&self, action: &Action);

    /// Recent actions of a table, oldest first.
    async fn recent(&self, table_id: &str) -> Vec<Action>;
}

/// Keeps the last `limit` actions of every table in memory.
pub struct MemoryHistory {
    limit: usize,
    tables: Mutex<HashMap<String, VecDeque<Action>>>,
}

impl MemoryHistory {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit, tables: Mutex::new(HashMap::new()) }
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistory {
    async fn record(&self, action: &Action) {
        if self.limit == 0 {
            return;
        }
        let mut tables = self
            .tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let log = tables.entry(action.table_id.clone()).or_default();
        if log.len() == self.limit {
            log.pop_front();
        }
        log.push_back(action.clone());
    }

    async fn recent(&self, table_id: &str) -> Vec<Action> {
        let tables = self
            .tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tables
            .get(table_id)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
