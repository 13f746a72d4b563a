mod job;
mod pgc;
mod pncp;

pub use job::{CollectionJob, JobReport, SourceReport};
pub use pgc::PgcCollector;
pub use pncp::PncpCollector;

use crate::error::{CollectionWarning, ScrapeError};
use crate::gate::SyncGate;
use crate::models::{CategoryPartition, ProcurementRecord, Source};

/// Everything one portal produced in one run.
#[derive(Debug)]
pub struct SourceYield {
    pub source: Source,
    pub records: Vec<ProcurementRecord>,
    /// Rows the portal presented, including ones that failed extraction.
    pub attempted: usize,
    pub skipped: usize,
    pub partitions: Vec<CategoryPartition>,
    pub warnings: Vec<CollectionWarning>,
}

impl SourceYield {
    fn new(source: Source) -> Self {
        Self {
            source,
            records: Vec::new(),
            attempted: 0,
            skipped: 0,
            partitions: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// A portal-specific collection routine.
///
/// Collectors assume the driver is already attached to a logged-in browser
/// and visit partitions, pages and rows in a fixed order.
#[async_trait::async_trait]
pub trait SourceCollector {
    fn source(&self) -> Source;

    async fn collect(
        &self,
        gate: &SyncGate<'_>,
        reference_year: &str,
    ) -> Result<SourceYield, ScrapeError>;
}
