use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::extract::{FieldMap, PartitionExtractor, StatusRule, StatusTypeRule};
use crate::gate::SyncGate;
use crate::locator::{Locator, LocatorTemplate};
use crate::models::{CategoryPartition, Source};
use crate::walker::{ListingWalker, PagedLocators, PagedStrategy};

use super::{SourceCollector, SourceYield};

/// Post-login landing checkpoint: the portal title span.
const POST_LOGIN_TITLE: &str = "Planejamento e Gerenciamento de Contratações";
/// Title fragment of the window the planning app opens in.
const APP_WINDOW_TITLE: &str = "Planejamento e Gerenciamento";

const POST_LOGIN_TIMEOUT: Duration = Duration::from_secs(45);

/// Collector for the PGC planning listing (paged table of DFD rows).
///
/// Flow: confirm the post-login landing page, click through to the planning
/// app (which opens a new window), pick the reference-year PCA and the "my
/// unit" scope, then walk the paged table extracting every page.
pub struct PgcCollector;

impl PgcCollector {
    fn paged_locators() -> PagedLocators {
        PagedLocators {
            rows: Locator::xpath("//div[contains(@class,'ui-datatable')]//tbody/tr"),
            first_button: Locator::css("a.ui-paginator-first"),
            last_button: Locator::css("a.ui-paginator-last"),
            next_button: Locator::css("a.ui-paginator-next"),
            active_page: Locator::css("a.ui-paginator-page.ui-state-active"),
        }
    }

    fn field_map() -> FieldMap {
        FieldMap {
            contract_id: "/td[1]".to_string(),
            description: "/td[3]".to_string(),
            category: "/td[2]".to_string(),
            value: "/td[4]".to_string(),
            start_date: None,
            end_date: None,
            status: StatusRule::FromField("/td[5]".to_string()),
            status_type: StatusTypeRule::MirrorStatus,
        }
    }

    async fn enter_planning_app(&self, gate: &SyncGate<'_>) -> Result<(), crate::error::ScrapeError> {
        gate.wait_for_checkpoint(
            &Locator::css("span.titulo-pagina"),
            Some(POST_LOGIN_TITLE),
            POST_LOGIN_TIMEOUT,
        )
        .await?;

        gate.safe_click(&Locator::text("Planejamento e Gerenciamento das Contratações"))
            .await?;
        gate.driver().adopt_window_by_title(APP_WINDOW_TITLE).await?;
        Ok(())
    }

    async fn select_reference_pca(
        &self,
        gate: &SyncGate<'_>,
        reference_year: &str,
    ) -> Result<(), crate::error::ScrapeError> {
        gate.safe_click(&Locator::id("form:comboPca")).await?;
        let year_option = LocatorTemplate::new(
            "//ul[@id='form:comboPca_items']/li[contains(normalize-space(.), '{index}')]",
        );
        gate.safe_click(&year_option.with(reference_year)).await?;
        gate.safe_click(&Locator::id("form:minhauasg")).await?;

        gate.wait_for_checkpoint(
            &Self::paged_locators().rows,
            None,
            Duration::from_secs(15),
        )
        .await?;
        gate.wait_for_busy_cleared().await
    }
}

#[async_trait]
impl SourceCollector for PgcCollector {
    fn source(&self) -> Source {
        Source::Pgc
    }

    async fn collect(
        &self,
        gate: &SyncGate<'_>,
        reference_year: &str,
    ) -> Result<SourceYield, crate::error::ScrapeError> {
        let mut output = SourceYield::new(Source::Pgc);

        self.enter_planning_app(gate).await?;
        self.select_reference_pca(gate, reference_year).await?;

        let locators = Self::paged_locators();
        let row_template = LocatorTemplate::new(
            "//div[contains(@class,'ui-datatable')]//tbody/tr[{index}]",
        );
        let extractor =
            PartitionExtractor::new(gate.driver(), "pgc", row_template, Self::field_map());

        let mut walker = PagedStrategy::open(gate, "pgc", locators).await?;
        let mut partition = CategoryPartition::new("pgc");

        loop {
            let rows = walker.current_rows().await?;
            let page_yield = extractor.extract_all(rows).await;
            output.attempted += page_yield.attempted;
            output.skipped += page_yield.skipped;
            output.records.extend(page_yield.records);

            if !walker.has_more().await? {
                break;
            }
            walker.advance().await?;
        }

        partition.reported_total_count = Some(output.attempted);
        output.partitions.push(partition);
        output.warnings.extend(walker.take_warnings());

        info!(
            pages = walker.discovered_pages(),
            records = output.records.len(),
            skipped = output.skipped,
            "planning listing collected"
        );
        Ok(output)
    }
}
