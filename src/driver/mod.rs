mod cdp;

pub use cdp::CdpDriver;

use async_trait::async_trait;

use crate::locator::Locator;

/// Errors from the browser automation layer.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// A script ran but reported a failure (bad selector, missing element
    /// where one was required, unexpected result shape).
    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    #[error("element not found: {0}")]
    NotFound(String),

    #[error("no browser window with title containing {0:?}")]
    NoWindow(String),

    #[error("no page available to drive")]
    NoPage,
}

impl DriverError {
    /// Failures worth one retry: the element vanished or the script
    /// misfired, typically because a re-render replaced the node mid-click.
    /// Transport and window-level failures are surfaced as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DriverError::NotFound(_) | DriverError::Evaluation(_))
    }
}

/// Everything the collection layers need from a browser.
///
/// One implementation speaks CDP to a live browser; tests substitute
/// in-memory fakes. All element addressing goes through [`Locator`] so the
/// same portal maps drive both.
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Re-bind to the currently active page. Called after anything that may
    /// have replaced or navigated the tab under us.
    async fn reset_context(&self) -> Result<(), DriverError>;

    /// Number of elements matching the locator right now.
    async fn count(&self, locator: &Locator) -> Result<usize, DriverError>;

    /// Trimmed text content of the first match, `None` when nothing matches.
    async fn read_text(&self, locator: &Locator) -> Result<Option<String>, DriverError>;

    /// Present in the DOM and rendered (non-zero box).
    async fn is_visible(&self, locator: &Locator) -> Result<bool, DriverError>;

    /// Visible and accepting interaction.
    async fn is_enabled(&self, locator: &Locator) -> Result<bool, DriverError>;

    /// Center the first match in the viewport.
    async fn scroll_into_view(&self, locator: &Locator) -> Result<(), DriverError>;

    /// Click the first match.
    async fn click(&self, locator: &Locator) -> Result<(), DriverError>;

    /// Scroll the listing that contains `container` down by `step_px`
    /// pixels, falling back to the window when no ancestor scrolls.
    async fn scroll_listing_by(&self, container: &Locator, step_px: i64)
        -> Result<(), DriverError>;

    /// Switch the driving context to the open window whose title contains
    /// `title_fragment`.
    async fn adopt_window_by_title(&self, title_fragment: &str) -> Result<(), DriverError>;
}
