use std::sync::OnceLock;
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::ScrollConfig;
use crate::error::{CollectionWarning, ScrapeError, StallReason};
use crate::gate::SyncGate;
use crate::locator::Locator;

use super::ListingWalker;

/// Elements of a virtualized-scroll listing.
#[derive(Debug, Clone)]
pub struct ScrollLocators {
    /// One row element per materialized record.
    pub rows: Locator,
    /// Element inside the scrollable listing; the nearest scrollable
    /// ancestor is what actually gets scrolled.
    pub container: Locator,
    /// On-screen counter carrying the reported total ("157 registros").
    pub counter: Locator,
}

/// Walker for listings that materialize rows on scroll.
///
/// The reported total is read from the on-screen counter up front; each
/// `advance` is one scroll round. Traversal ends when the loaded row count
/// reaches the reported total, when growth stalls for a configured number of
/// rounds, or when the overall budget runs out. The latter two produce a
/// warning but not an error: what loaded is still extracted.
pub struct VirtualizedScrollStrategy<'a> {
    gate: &'a SyncGate<'a>,
    scroll: ScrollConfig,
    partition: String,
    locators: ScrollLocators,
    reported_total: Option<usize>,
    loaded: usize,
    stagnant_rounds: usize,
    deadline: Instant,
    finished: bool,
    warnings: Vec<CollectionWarning>,
}

impl<'a> VirtualizedScrollStrategy<'a> {
    /// Read the reported total and the initially materialized rows.
    pub async fn open(
        gate: &'a SyncGate<'a>,
        scroll: ScrollConfig,
        partition: impl Into<String>,
        locators: ScrollLocators,
    ) -> Result<VirtualizedScrollStrategy<'a>, ScrapeError> {
        let partition = partition.into();
        let reported_total = read_counter(gate, &locators.counter, &scroll).await?;
        if reported_total.is_none() {
            warn!(partition = %partition, "no readable total counter; relying on stagnation");
        }
        let loaded = gate.driver().count(&locators.rows).await?;
        debug!(partition = %partition, ?reported_total, loaded, "scroll listing opened");

        let deadline = Instant::now() + scroll.materialization_timeout();
        Ok(VirtualizedScrollStrategy {
            gate,
            scroll,
            partition,
            locators,
            reported_total,
            loaded,
            stagnant_rounds: 0,
            deadline,
            finished: false,
            warnings: Vec::new(),
        })
    }

    pub fn reported_total(&self) -> Option<usize> {
        self.reported_total
    }

    pub fn loaded(&self) -> usize {
        self.loaded
    }

    fn finish(&mut self, stall: Option<StallReason>) {
        self.finished = true;
        if let (Some(reason), Some(reported)) = (stall, self.reported_total) {
            if self.loaded < reported {
                warn!(
                    partition = %self.partition,
                    reported,
                    loaded = self.loaded,
                    ?reason,
                    "listing stopped materializing before its reported total"
                );
                self.warnings.push(CollectionWarning::PartialMaterialization {
                    partition: self.partition.clone(),
                    reported,
                    loaded: self.loaded,
                    reason,
                });
            }
        }
    }
}

#[async_trait]
impl ListingWalker for VirtualizedScrollStrategy<'_> {
    async fn has_more(&mut self) -> Result<bool, ScrapeError> {
        if self.finished {
            return Ok(false);
        }
        if let Some(reported) = self.reported_total {
            if self.loaded >= reported {
                self.finish(None);
                return Ok(false);
            }
        }
        if self.stagnant_rounds >= self.scroll.stagnation_rounds {
            self.finish(Some(StallReason::Stagnation));
            return Ok(false);
        }
        if Instant::now() >= self.deadline {
            self.finish(Some(StallReason::Timeout));
            return Ok(false);
        }
        // Without a reported total, stagnation is the only terminator.
        Ok(true)
    }

    async fn advance(&mut self) -> Result<(), ScrapeError> {
        self.gate.wait_for_busy_cleared().await?;
        self.gate
            .driver()
            .scroll_listing_by(&self.locators.container, self.scroll.step_px)
            .await?;
        self.gate.wait_for_busy_cleared().await?;

        let now_loaded = self.gate.driver().count(&self.locators.rows).await?;
        if now_loaded > self.loaded {
            self.loaded = now_loaded;
            self.stagnant_rounds = 0;
        } else {
            self.stagnant_rounds += 1;
        }
        Ok(())
    }

    async fn current_rows(&mut self) -> Result<usize, ScrapeError> {
        // Focus can drift to another tab between rounds; re-bind first.
        self.gate.driver().reset_context().await?;
        let count = self.gate.driver().count(&self.locators.rows).await?;
        self.loaded = self.loaded.max(count);
        Ok(count)
    }

    fn take_warnings(&mut self) -> Vec<CollectionWarning> {
        std::mem::take(&mut self.warnings)
    }
}

/// Poll the counter element for a parseable integer.
///
/// `None` when the counter never renders a number inside its budget; an
/// absent counter is not an error, just a weaker termination condition.
async fn read_counter(
    gate: &SyncGate<'_>,
    counter: &Locator,
    scroll: &ScrollConfig,
) -> Result<Option<usize>, ScrapeError> {
    let deadline = Instant::now() + scroll.counter_timeout();
    loop {
        if let Some(text) = gate.driver().read_text(counter).await? {
            if let Some(total) = parse_counter(&text) {
                return Ok(Some(total));
            }
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(gate.waits().poll()).await;
    }
}

/// First integer in the counter text, thousands separators removed.
fn parse_counter(text: &str) -> Option<usize> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"\d[\d.]*").expect("static regex"));
    let raw = re.find(text)?.as_str().replace('.', "");
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_parses_plain_and_labeled_totals() {
        assert_eq!(parse_counter("157"), Some(157));
        assert_eq!(parse_counter("Total de 157 registros"), Some(157));
        assert_eq!(parse_counter("1.204 itens"), Some(1204));
    }

    #[test]
    fn counter_without_digits_is_none() {
        assert_eq!(parse_counter("Carregando..."), None);
        assert_eq!(parse_counter(""), None);
    }
}
