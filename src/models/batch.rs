use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProcurementRecord, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Raw,
    Consolidated,
}

/// One append-only capture of records from a portal.
///
/// Batches are write-once: consolidation flips `status` but never rewrites
/// the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBatch {
    pub id: Uuid,
    pub source: Source,
    pub captured_at: DateTime<Utc>,
    pub payload: Vec<ProcurementRecord>,
    pub status: BatchStatus,
}

impl RawBatch {
    pub fn new(source: Source, captured_at: DateTime<Utc>, payload: Vec<ProcurementRecord>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            captured_at,
            payload,
            status: BatchStatus::Raw,
        }
    }
}
