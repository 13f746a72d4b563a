mod json_file;

pub use json_file::JsonFileStore;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{CanonicalRecord, RawBatch};

/// Outcome of one consolidation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    /// Raw batches consolidated by this pass.
    pub batches: usize,
    /// Canonical records written (new or overwritten).
    pub upserted: usize,
    /// Individual records that could not be written and were skipped.
    pub skipped: usize,
}

/// Two-stage persistence: an append-only raw area and an idempotent
/// canonical area keyed by business id.
///
/// Raw batches are never mutated after capture (consolidation only flips
/// their status), so any consolidation bug can be replayed from raw.
#[async_trait]
pub trait ConsolidationStore: Send + Sync {
    /// Append one capture batch to the raw area.
    async fn append_raw(&self, batch: &RawBatch) -> Result<()>;

    /// All raw batches, oldest first.
    async fn raw_batches(&self) -> Result<Vec<RawBatch>>;

    /// All canonical records, in unspecified order.
    async fn canonical_records(&self) -> Result<Vec<CanonicalRecord>>;

    /// Upsert every record of every unconsolidated raw batch into the
    /// canonical area. Re-running over already-consolidated data changes
    /// nothing.
    async fn consolidate(&self) -> Result<ConsolidationReport>;
}
