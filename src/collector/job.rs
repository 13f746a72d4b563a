use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::clock::Clock;
use crate::config::{ScrollConfig, SessionConfig, WaitConfig};
use crate::error::CollectionWarning;
use crate::gate::SyncGate;
use crate::locator::Locator;
use crate::models::{RawBatch, Source};
use crate::session::SessionBroker;
use crate::store::{ConsolidationReport, ConsolidationStore};

use super::{PgcCollector, PncpCollector, SourceCollector};

/// What one source contributed to a job.
#[derive(Debug, Serialize)]
pub struct SourceReport {
    pub source: Source,
    /// Rows the portal presented.
    pub attempted: usize,
    /// Rows that became valid records.
    pub extracted: usize,
    /// Rows dropped by per-row fault isolation.
    pub skipped: usize,
    pub warnings: Vec<CollectionWarning>,
}

/// Full outcome of one collection job.
#[derive(Debug, Serialize)]
pub struct JobReport {
    pub reference_year: String,
    pub sources: Vec<SourceReport>,
    pub consolidation: ConsolidationReport,
}

/// End-to-end orchestration of a collection run.
///
/// Sequential pipeline: open session, wait for the operator to log in,
/// attach, collect each requested source with the same driver, persist raw
/// batches, consolidate. The driver is released on every exit path.
pub struct CollectionJob {
    broker: SessionBroker,
    waits: WaitConfig,
    scroll: ScrollConfig,
    store: Arc<dyn ConsolidationStore>,
    clock: Arc<dyn Clock>,
}

impl CollectionJob {
    pub fn new(
        session_config: SessionConfig,
        waits: WaitConfig,
        scroll: ScrollConfig,
        profile_dir: Option<std::path::PathBuf>,
        store: Arc<dyn ConsolidationStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let broker = SessionBroker::new(session_config, waits.clone(), profile_dir)?;
        Ok(Self {
            broker,
            waits,
            scroll,
            store,
            clock,
        })
    }

    /// Busy indicator shared by both portals' frontends.
    fn busy_indicator() -> Locator {
        Locator::css(".p-progress-spinner, .ui-widget-overlay, .loading-overlay")
    }

    pub async fn run(&self, reference_year: &str, sources: &[Source]) -> Result<JobReport> {
        let mut session = self.broker.open().await?;

        let login_url = match self.broker.await_manual_login(&mut session).await {
            Ok(url) => url,
            Err(e) => {
                self.broker.release(&mut session, None).await;
                return Err(e.into());
            }
        };
        info!(url = %login_url, "login complete, attaching");

        let driver = match self.broker.attach(&mut session).await {
            Ok(driver) => driver,
            Err(e) => {
                self.broker.release(&mut session, None).await;
                return Err(e.into());
            }
        };

        let outcome = self.collect_all(&driver, reference_year, sources).await;

        self.broker.release(&mut session, Some(driver)).await;
        outcome
    }

    async fn collect_all(
        &self,
        driver: &crate::driver::CdpDriver,
        reference_year: &str,
        sources: &[Source],
    ) -> Result<JobReport> {
        let gate = SyncGate::new(driver, self.waits.clone(), Self::busy_indicator());
        let mut reports = Vec::with_capacity(sources.len());

        for source in sources {
            let collector: Box<dyn SourceCollector + Send + Sync> = match source {
                Source::Pgc => Box::new(PgcCollector),
                Source::Pncp => Box::new(PncpCollector::new(self.scroll.clone())),
            };

            info!(%source, reference_year, "collecting source");
            let mut collected = collector.collect(&gate, reference_year).await?;

            let batch = RawBatch::new(
                collected.source,
                self.clock.now(),
                std::mem::take(&mut collected.records),
            );
            self.store.append_raw(&batch).await?;

            reports.push(SourceReport {
                source: collected.source,
                attempted: collected.attempted,
                extracted: batch.payload.len(),
                skipped: collected.skipped,
                warnings: collected.warnings,
            });
        }

        let consolidation = self.store.consolidate().await?;
        info!(?consolidation, "job finished");

        Ok(JobReport {
            reference_year: reference_year.to_string(),
            sources: reports,
            consolidation,
        })
    }
}
