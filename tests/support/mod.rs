#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use pca_coleta::config::{ScrollConfig, WaitConfig};
use pca_coleta::driver::{DriverError, UiDriver};
use pca_coleta::locator::Locator;
use pca_coleta::models::ProcurementRecord;

/// Millisecond-scale waits so polling loops finish fast.
pub fn fast_waits() -> WaitConfig {
    WaitConfig {
        login_timeout_secs: 2,
        login_poll_millis: 10,
        checkpoint_timeout_secs: 1,
        checkpoint_text_timeout_secs: 1,
        spinner_grace_millis: 5,
        spinner_timeout_secs: 1,
        poll_millis: 1,
        click_retry_backoff_millis: 1,
    }
}

pub fn fast_scroll(stagnation_rounds: usize) -> ScrollConfig {
    ScrollConfig {
        step_px: 800,
        stagnation_rounds,
        materialization_timeout_secs: 10,
        counter_timeout_secs: 1,
    }
}

pub fn sample_record(n: u32) -> ProcurementRecord {
    ProcurementRecord {
        contract_id: format!("{n:05}/2025"),
        description: format!("{n:03}2025 - Aquisição de material {n}"),
        category: "Bens".to_string(),
        value: Decimal::new(1000 + i64::from(n), 2),
        start_date: None,
        end_date: None,
        status: "APROVADA".to_string(),
        status_type: "APROVADA".to_string(),
        document_ref: format!("{n:03}/2025"),
    }
}

/// Virtualized listing that materializes a fixed number of rows per scroll
/// round, optionally plateauing before the reported total.
pub struct FakeScrollDom {
    pub reported_total: usize,
    pub rows_per_scroll: usize,
    /// Row count growth stops here even if below the reported total.
    pub plateau_at: Option<usize>,
    loaded: AtomicUsize,
    scrolls: AtomicUsize,
}

impl FakeScrollDom {
    pub fn new(reported_total: usize, rows_per_scroll: usize) -> Self {
        Self {
            reported_total,
            rows_per_scroll,
            plateau_at: None,
            loaded: AtomicUsize::new(0),
            scrolls: AtomicUsize::new(0),
        }
    }

    pub fn with_plateau(mut self, plateau_at: usize) -> Self {
        self.plateau_at = Some(plateau_at);
        self
    }

    pub fn scroll_rounds(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    pub fn loaded(&self) -> usize {
        self.loaded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UiDriver for FakeScrollDom {
    async fn reset_context(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        if locator.value.contains("row") {
            return Ok(self.loaded.load(Ordering::SeqCst));
        }
        Ok(0)
    }

    async fn read_text(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        if locator.value.contains("counter") {
            return Ok(Some(format!("{} registros", self.reported_total)));
        }
        Ok(None)
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, DriverError> {
        Ok(!locator.value.contains("busy"))
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<bool, DriverError> {
        self.is_visible(locator).await
    }

    async fn scroll_into_view(&self, _: &Locator) -> Result<(), DriverError> {
        Ok(())
    }

    async fn click(&self, _: &Locator) -> Result<(), DriverError> {
        Ok(())
    }

    async fn scroll_listing_by(&self, _: &Locator, _: i64) -> Result<(), DriverError> {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        let ceiling = self.plateau_at.unwrap_or(self.reported_total);
        let loaded = self.loaded.load(Ordering::SeqCst);
        self.loaded
            .store((loaded + self.rows_per_scroll).min(ceiling), Ordering::SeqCst);
        Ok(())
    }

    async fn adopt_window_by_title(&self, _: &str) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Standard locators for driving [`FakeScrollDom`].
pub fn scroll_locators() -> pca_coleta::walker::ScrollLocators {
    pca_coleta::walker::ScrollLocators {
        rows: Locator::css(".row"),
        container: Locator::css(".container"),
        counter: Locator::css(".counter"),
    }
}

/// Paged listing with a fixed number of pages and rows per page.
///
/// Locator matching is by value fragment: "next", "first", "last", "active"
/// and "row" address the paginator pieces.
pub struct FakePagedDom {
    pub rows_per_page: Vec<usize>,
    /// The "next" control dies after this many pages, regardless of the
    /// page count the paginator advertises.
    pub next_breaks_after: Option<usize>,
    current: AtomicUsize,
}

impl FakePagedDom {
    pub fn new(rows_per_page: Vec<usize>) -> Self {
        Self {
            rows_per_page,
            next_breaks_after: None,
            current: AtomicUsize::new(1),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    fn pages(&self) -> usize {
        self.rows_per_page.len()
    }
}

#[async_trait]
impl UiDriver for FakePagedDom {
    async fn reset_context(&self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        if locator.value.contains("row") {
            let page = self.current.load(Ordering::SeqCst);
            return Ok(self.rows_per_page[page - 1]);
        }
        // Paginator controls exist whenever there is more than one page.
        Ok(usize::from(self.pages() > 1))
    }

    async fn read_text(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        if locator.value.contains("active") {
            return Ok(Some(self.current.load(Ordering::SeqCst).to_string()));
        }
        Ok(None)
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, DriverError> {
        Ok(!locator.value.contains("busy"))
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<bool, DriverError> {
        if locator.value.contains("next") {
            let page = self.current.load(Ordering::SeqCst);
            let limit = self.next_breaks_after.unwrap_or(self.pages());
            return Ok(page < limit.min(self.pages()));
        }
        self.is_visible(locator).await
    }

    async fn scroll_into_view(&self, _: &Locator) -> Result<(), DriverError> {
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), DriverError> {
        if locator.value.contains("next") {
            self.current.fetch_add(1, Ordering::SeqCst);
        } else if locator.value.contains("last") {
            self.current.store(self.pages(), Ordering::SeqCst);
        } else if locator.value.contains("first") {
            self.current.store(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn scroll_listing_by(&self, _: &Locator, _: i64) -> Result<(), DriverError> {
        Ok(())
    }

    async fn adopt_window_by_title(&self, _: &str) -> Result<(), DriverError> {
        Ok(())
    }
}

pub fn paged_locators() -> pca_coleta::walker::PagedLocators {
    pca_coleta::walker::PagedLocators {
        rows: Locator::css(".row"),
        first_button: Locator::css(".first"),
        last_button: Locator::css(".last"),
        next_button: Locator::css(".next"),
        active_page: Locator::css(".active"),
    }
}

/// Row grid addressed by the extractor's XPath conventions.
///
/// Rows are cell maps keyed by field suffix; a row with missing required
/// cells simulates a malformed listing entry.
pub struct FakeRowsDom {
    pub rows: Mutex<Vec<HashMap<String, String>>>,
    resets: AtomicUsize,
}

impl FakeRowsDom {
    pub fn new(rows: Vec<HashMap<String, String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            resets: AtomicUsize::new(0),
        }
    }

    pub fn context_resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn well_formed_row(n: u32) -> HashMap<String, String> {
        let mut cells = HashMap::new();
        cells.insert("/td[1]".to_string(), format!("{n:05}/2025"));
        cells.insert("/td[2]".to_string(), "Diretoria de Ensino".to_string());
        cells.insert("/td[3]".to_string(), format!("{n:03}2025 - Aquisição {n}"));
        cells.insert("/td[4]".to_string(), "R$ 1.500,50".to_string());
        cells.insert("/td[5]".to_string(), "APROVADA".to_string());
        cells
    }

    fn lookup(&self, value: &str) -> Option<String> {
        let index = row_index(value)?;
        let rows = self.rows.lock().unwrap();
        let row = rows.get(index.checked_sub(1)?)?;
        row.iter()
            .find(|(suffix, _)| value.ends_with(suffix.as_str()))
            .map(|(_, text)| text.clone())
    }
}

fn row_index(value: &str) -> Option<usize> {
    let start = value.find("/tr[")? + 4;
    let end = value[start..].find(']')? + start;
    value[start..end].parse().ok()
}

#[async_trait]
impl UiDriver for FakeRowsDom {
    async fn reset_context(&self) -> Result<(), DriverError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn count(&self, _: &Locator) -> Result<usize, DriverError> {
        Ok(self.rows.lock().unwrap().len())
    }

    async fn read_text(&self, locator: &Locator) -> Result<Option<String>, DriverError> {
        Ok(self.lookup(&locator.value))
    }

    async fn is_visible(&self, _: &Locator) -> Result<bool, DriverError> {
        Ok(true)
    }

    async fn is_enabled(&self, _: &Locator) -> Result<bool, DriverError> {
        Ok(true)
    }

    async fn scroll_into_view(&self, _: &Locator) -> Result<(), DriverError> {
        Ok(())
    }

    async fn click(&self, _: &Locator) -> Result<(), DriverError> {
        Ok(())
    }

    async fn scroll_listing_by(&self, _: &Locator, _: i64) -> Result<(), DriverError> {
        Ok(())
    }

    async fn adopt_window_by_title(&self, _: &str) -> Result<(), DriverError> {
        Ok(())
    }
}
