//! In-memory usage ledger.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{LedgerError, UsageLedger, UsageRecord};

/// Unbounded in-memory ledger for testing and dev.
///
/// Clones share the same record list, so a test can keep one handle while the
/// dispatcher appends through another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUsageLedger {
    records: Arc<Mutex<Vec<UsageRecord>>>,
}

impl InMemoryUsageLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a snapshot of stored records in append order.
    #[must_use]
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().clone()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl UsageLedger for InMemoryUsageLedger {
    fn record(&self, entry: UsageRecord) -> Result<(), LedgerError> {
        self.records.lock().push(entry);
        Ok(())
    }
}
