use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::WaitConfig;
use crate::driver::{DriverError, UiDriver};
use crate::error::ScrapeError;
use crate::locator::Locator;

/// Synchronization layer between intent ("the listing is ready") and the
/// portal's asynchronous rendering.
///
/// Collectors never sleep for fixed durations; every wait here polls a
/// checkpoint condition and gives up with a typed timeout.
pub struct SyncGate<'a> {
    driver: &'a dyn UiDriver,
    waits: WaitConfig,
    busy_indicator: Locator,
}

impl<'a> SyncGate<'a> {
    pub fn new(driver: &'a dyn UiDriver, waits: WaitConfig, busy_indicator: Locator) -> Self {
        Self {
            driver,
            waits,
            busy_indicator,
        }
    }

    pub fn driver(&self) -> &dyn UiDriver {
        self.driver
    }

    pub fn waits(&self) -> &WaitConfig {
        &self.waits
    }

    /// Wait until `locator` is visible, and when `expected_text` is given,
    /// until its text contains that fragment.
    ///
    /// The text condition gets its own (shorter) budget once the element is
    /// visible, so a present-but-wrong element fails fast with the observed
    /// text in the error.
    pub async fn wait_for_checkpoint(
        &self,
        locator: &Locator,
        expected_text: Option<&str>,
        timeout: Duration,
    ) -> Result<(), ScrapeError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.driver.is_visible(locator).await? {
                break;
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::CheckpointTimeout {
                    locator: locator.to_string(),
                    expected_text: expected_text.map(str::to_string),
                    observed_text: None,
                });
            }
            tokio::time::sleep(self.waits.poll()).await;
        }

        let Some(expected) = expected_text else {
            return Ok(());
        };

        let text_deadline = Instant::now() + self.waits.checkpoint_text_timeout();
        let wanted = expected.to_lowercase();
        let mut observed = None;
        loop {
            let text = self.driver.read_text(locator).await?;
            if let Some(text) = &text {
                if text.to_lowercase().contains(&wanted) {
                    return Ok(());
                }
            }
            observed = text;
            if Instant::now() >= text_deadline {
                return Err(ScrapeError::CheckpointTimeout {
                    locator: locator.to_string(),
                    expected_text: Some(expected.to_string()),
                    observed_text: observed,
                });
            }
            tokio::time::sleep(self.waits.poll()).await;
        }
    }

    /// Wait for the portal's busy indicator to clear.
    ///
    /// A short grace window first watches for the indicator to appear at all
    /// (it may not have rendered yet when the triggering click returns). A
    /// stuck indicator is logged and tolerated; stale-but-interactive pages
    /// are recoverable, a hard failure here is not.
    pub async fn wait_for_busy_cleared(&self) -> Result<(), ScrapeError> {
        let grace_deadline = Instant::now() + self.waits.spinner_grace();
        let mut appeared = false;
        while Instant::now() < grace_deadline {
            if self.driver.is_visible(&self.busy_indicator).await? {
                appeared = true;
                break;
            }
            tokio::time::sleep(self.waits.poll()).await;
        }
        if !appeared {
            return Ok(());
        }

        let deadline = Instant::now() + self.waits.spinner_timeout();
        while Instant::now() < deadline {
            if !self.driver.is_visible(&self.busy_indicator).await? {
                return Ok(());
            }
            tokio::time::sleep(self.waits.poll()).await;
        }
        warn!(indicator = %self.busy_indicator, "busy indicator never cleared; continuing");
        Ok(())
    }

    /// Click with the full synchronization protocol: re-bind the page
    /// context, wait until the element accepts interaction, center it, click,
    /// then wait for the busy indicator to clear. One retry after a short
    /// backoff covers elements replaced mid-click by a re-render.
    pub async fn safe_click(&self, locator: &Locator) -> Result<(), ScrapeError> {
        self.driver.reset_context().await?;
        self.wait_until_clickable(locator).await?;

        if let Err(first) = self.try_click(locator).await {
            if !first.is_retryable() {
                return Err(first.into());
            }
            debug!(%locator, error = %first, "click failed, retrying once");
            tokio::time::sleep(self.waits.click_retry_backoff()).await;
            self.driver.reset_context().await?;
            self.wait_until_clickable(locator).await?;
            self.try_click(locator).await?;
        }

        self.wait_for_busy_cleared().await
    }

    async fn try_click(&self, locator: &Locator) -> Result<(), DriverError> {
        self.driver.scroll_into_view(locator).await?;
        self.driver.click(locator).await
    }

    async fn wait_until_clickable(&self, locator: &Locator) -> Result<(), ScrapeError> {
        let deadline = Instant::now() + self.waits.checkpoint_timeout();
        loop {
            if self.driver.is_enabled(locator).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::CheckpointTimeout {
                    locator: locator.to_string(),
                    expected_text: None,
                    observed_text: None,
                });
            }
            tokio::time::sleep(self.waits.poll()).await;
        }
    }
}
