use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::ScrapeError;
use crate::extract::{FieldMap, PartitionExtractor, StatusRule, StatusTypeRule};
use crate::gate::SyncGate;
use crate::locator::{Locator, LocatorTemplate};
use crate::models::{CategoryPartition, Source};
use crate::walker::{materialize, ScrollLocators, VirtualizedScrollStrategy};

use super::{SourceCollector, SourceYield};

/// Partition tabs in their fixed visit order.
const PARTITIONS: [&str; 3] = ["reprovadas", "aprovadas", "pendentes"];

const ENTRY_BUTTON_TIMEOUT: Duration = Duration::from_secs(50);
const DROPDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Collector for the PNCP plan-formation listing.
///
/// Each status tab is an independent virtualized-scroll partition: rejected
/// rows carry their status implicitly, approved and pending rows show it per
/// row. A partition that fails wholesale is logged and the next one still
/// runs; order is always rejected, approved, pending.
pub struct PncpCollector {
    scroll: crate::config::ScrollConfig,
}

impl PncpCollector {
    pub fn new(scroll: crate::config::ScrollConfig) -> Self {
        Self { scroll }
    }

    fn tab_panel(tab: &str) -> String {
        format!("//div[@aria-labelledby='{tab}']")
    }

    fn empty_state(tab: &str) -> Locator {
        Locator::xpath(format!(
            "{}/div[@class='search-results']/div/div/div/div/div[2]/span",
            Self::tab_panel(tab)
        ))
    }

    fn scroll_locators(tab: &str) -> ScrollLocators {
        let panel = Self::tab_panel(tab);
        ScrollLocators {
            rows: Locator::xpath(format!(
                "{panel}//div[contains(@class,'p-datatable-tbody')]/div"
            )),
            container: Locator::xpath(format!(
                "{panel}//div[contains(@class,'p-datatable-tbody')]"
            )),
            counter: Locator::xpath(format!(
                "{panel}/div[@class='search-results']/div/div/div/div/div[1]/span"
            )),
        }
    }

    fn row_template(tab: &str) -> LocatorTemplate {
        LocatorTemplate::new(format!(
            "{}//div[contains(@class,'p-datatable-tbody')]/div[{{index}}]",
            Self::tab_panel(tab)
        ))
    }

    fn field_map(tab: &str) -> FieldMap {
        let status = match tab {
            "reprovadas" => StatusRule::Fixed("REPROVADA".to_string()),
            "aprovadas" => StatusRule::FromField("/div/div[7]/span[2]".to_string()),
            _ => StatusRule::FromField("/div/div[7]/span".to_string()),
        };
        let status_type = if tab == "aprovadas" {
            StatusTypeRule::Fixed("APROVADA".to_string())
        } else {
            StatusTypeRule::MirrorStatus
        };
        FieldMap {
            contract_id: "/div/div[1]/span".to_string(),
            description: "/div/div[2]/span".to_string(),
            category: "/div/div[3]/span".to_string(),
            value: "/div/div[4]/span".to_string(),
            start_date: Some("/div/div[5]/span".to_string()),
            end_date: Some("/div/div[6]/span".to_string()),
            status,
            status_type,
        }
    }

    async fn enter_plan_formation(
        &self,
        gate: &SyncGate<'_>,
        reference_year: &str,
    ) -> Result<(), ScrapeError> {
        gate.wait_for_busy_cleared().await?;

        let entry = Locator::text("Formação do PCA");
        gate.wait_for_checkpoint(&entry, None, ENTRY_BUTTON_TIMEOUT).await?;
        gate.safe_click(&entry).await?;

        let dropdown = Locator::css("p-dropdown[formcontrolname='anoPca']");
        gate.wait_for_checkpoint(&dropdown, None, DROPDOWN_TIMEOUT).await?;
        gate.safe_click(&dropdown).await?;

        let year_option = LocatorTemplate::new(
            "//p-dropdownitem/li[contains(normalize-space(.), '{index}')]",
        );
        gate.safe_click(&year_option.with(reference_year)).await
    }

    async fn collect_partition(
        &self,
        gate: &SyncGate<'_>,
        tab: &str,
        output: &mut SourceYield,
    ) -> Result<(), ScrapeError> {
        gate.safe_click(&Locator::id(tab)).await?;
        gate.wait_for_busy_cleared().await?;

        let mut partition = CategoryPartition::new(tab);

        if gate.driver().count(&Self::empty_state(tab)).await? > 0 {
            info!(partition = tab, "partition is empty");
            partition.reported_total_count = Some(0);
            output.partitions.push(partition);
            return Ok(());
        }

        let mut walker = VirtualizedScrollStrategy::open(
            gate,
            self.scroll.clone(),
            tab,
            Self::scroll_locators(tab),
        )
        .await?;
        partition.reported_total_count = walker.reported_total();

        if walker.reported_total() == Some(0) {
            info!(partition = tab, "counter reports zero rows");
            output.partitions.push(partition);
            return Ok(());
        }

        let materialized = materialize(&mut walker).await?;
        output.warnings.extend(materialized.warnings);

        let extractor = PartitionExtractor::new(
            gate.driver(),
            tab,
            Self::row_template(tab),
            Self::field_map(tab),
        );
        let partition_yield = extractor.extract_all(materialized.rows).await;
        info!(
            partition = tab,
            reported = ?partition.reported_total_count,
            extracted = partition_yield.records.len(),
            skipped = partition_yield.skipped,
            "partition collected"
        );

        output.attempted += partition_yield.attempted;
        output.skipped += partition_yield.skipped;
        output.records.extend(partition_yield.records);
        output.partitions.push(partition);
        Ok(())
    }
}

#[async_trait]
impl SourceCollector for PncpCollector {
    fn source(&self) -> Source {
        Source::Pncp
    }

    async fn collect(
        &self,
        gate: &SyncGate<'_>,
        reference_year: &str,
    ) -> Result<SourceYield, ScrapeError> {
        let mut output = SourceYield::new(Source::Pncp);

        self.enter_plan_formation(gate, reference_year).await?;

        for tab in PARTITIONS {
            if let Err(e) = self.collect_partition(gate, tab, &mut output).await {
                // One broken tab must not cost the remaining partitions.
                error!(partition = tab, error = %e, "partition collection failed");
            }
        }

        info!(
            records = output.records.len(),
            skipped = output.skipped,
            "plan-formation listing collected"
        );
        Ok(output)
    }
}
