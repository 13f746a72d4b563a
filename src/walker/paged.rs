use async_trait::async_trait;

use crate::error::{CollectionWarning, ScrapeError};
use crate::gate::SyncGate;
use crate::locator::Locator;

use super::ListingWalker;

/// Pagination controls of a paged listing.
#[derive(Debug, Clone)]
pub struct PagedLocators {
    /// One row element per record.
    pub rows: Locator,
    /// Control that jumps to the first page.
    pub first_button: Locator,
    /// Control that jumps to the last page.
    pub last_button: Locator,
    /// Control that advances one page.
    pub next_button: Locator,
    /// Element showing the current page number.
    pub active_page: Locator,
}

/// Walker for listings split into discrete pages behind a paginator.
///
/// The page count is discovered up front by jumping to the last page and
/// reading the active page number, then jumping back. Pages are then walked
/// in strictly ascending order, one `advance` per page transition.
pub struct PagedStrategy<'a> {
    gate: &'a SyncGate<'a>,
    partition: String,
    locators: PagedLocators,
    discovered_pages: usize,
    current_page: usize,
    warnings: Vec<CollectionWarning>,
}

impl<'a> PagedStrategy<'a> {
    /// Discover the page count and position the listing on page one.
    pub async fn open(
        gate: &'a SyncGate<'a>,
        partition: impl Into<String>,
        locators: PagedLocators,
    ) -> Result<PagedStrategy<'a>, ScrapeError> {
        let partition = partition.into();
        let discovered_pages = if gate.driver().count(&locators.last_button).await? == 0 {
            // No paginator rendered: everything fits on a single page.
            1
        } else {
            gate.safe_click(&locators.last_button).await?;
            let last = read_page_number(gate, &locators.active_page).await?;
            gate.safe_click(&locators.first_button).await?;
            last
        };

        tracing::debug!(partition = %partition, pages = discovered_pages, "paginator discovered");
        Ok(PagedStrategy {
            gate,
            partition,
            locators,
            discovered_pages,
            current_page: 1,
            warnings: Vec::new(),
        })
    }

    pub fn discovered_pages(&self) -> usize {
        self.discovered_pages
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }
}

#[async_trait]
impl ListingWalker for PagedStrategy<'_> {
    async fn has_more(&mut self) -> Result<bool, ScrapeError> {
        if self.current_page >= self.discovered_pages {
            return Ok(false);
        }
        if !self.gate.driver().is_enabled(&self.locators.next_button).await? {
            // The paginator disagrees with the count we discovered. End the
            // walk here and record the shortfall; reporting "more" would
            // make the caller extract the current page again.
            self.warnings.push(CollectionWarning::PaginationCoverage {
                partition: self.partition.clone(),
                discovered_pages: self.discovered_pages,
                walked_pages: self.current_page,
            });
            self.discovered_pages = self.current_page;
            return Ok(false);
        }
        Ok(true)
    }

    /// Move to the next page. Callers check `has_more` first; the next
    /// control is known to be live when this runs.
    async fn advance(&mut self) -> Result<(), ScrapeError> {
        self.gate.safe_click(&self.locators.next_button).await?;
        self.gate
            .wait_for_checkpoint(
                &self.locators.rows,
                None,
                self.gate_checkpoint_timeout(),
            )
            .await?;
        self.current_page += 1;
        Ok(())
    }

    async fn current_rows(&mut self) -> Result<usize, ScrapeError> {
        // Focus can drift to another tab between rounds; re-bind first.
        self.gate.driver().reset_context().await?;
        Ok(self.gate.driver().count(&self.locators.rows).await?)
    }

    fn take_warnings(&mut self) -> Vec<CollectionWarning> {
        std::mem::take(&mut self.warnings)
    }
}

impl PagedStrategy<'_> {
    fn gate_checkpoint_timeout(&self) -> std::time::Duration {
        self.gate.waits().checkpoint_timeout()
    }
}

async fn read_page_number(gate: &SyncGate<'_>, active_page: &Locator) -> Result<usize, ScrapeError> {
    let text = gate
        .driver()
        .read_text(active_page)
        .await?
        .unwrap_or_default();
    text.trim().parse().map_err(|_| ScrapeError::CheckpointTimeout {
        locator: active_page.to_string(),
        expected_text: Some("page number".to_string()),
        observed_text: Some(text),
    })
}
