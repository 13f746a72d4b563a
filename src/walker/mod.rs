mod paged;
mod scroll;

pub use paged::{PagedLocators, PagedStrategy};
pub use scroll::{ScrollLocators, VirtualizedScrollStrategy};

use async_trait::async_trait;

use crate::error::{CollectionWarning, ScrapeError};

/// Traversal over a listing whose rows appear incrementally.
///
/// Two shapes exist: discrete pages behind a paginator, and a virtualized
/// scroll container that materializes rows as it scrolls. Callers drive both
/// through the same loop and read non-fatal outcomes from `take_warnings`.
#[async_trait]
pub trait ListingWalker: Send {
    /// Whether another `advance` can surface more rows.
    async fn has_more(&mut self) -> Result<bool, ScrapeError>;

    /// Surface the next increment of rows (next page, or one scroll round).
    async fn advance(&mut self) -> Result<(), ScrapeError>;

    /// Rows currently present in the DOM.
    async fn current_rows(&mut self) -> Result<usize, ScrapeError>;

    /// Drain warnings accumulated so far (partial coverage, stalls).
    fn take_warnings(&mut self) -> Vec<CollectionWarning>;
}

/// Final state of a fully driven walker.
#[derive(Debug)]
pub struct Materialization {
    pub rows: usize,
    pub warnings: Vec<CollectionWarning>,
}

/// Run a walker to completion.
///
/// Used for virtualized listings, where extraction happens once after all
/// rows are materialized. Paged listings interleave extraction per page and
/// drive the walker directly instead.
pub async fn materialize(walker: &mut dyn ListingWalker) -> Result<Materialization, ScrapeError> {
    while walker.has_more().await? {
        walker.advance().await?;
    }
    Ok(Materialization {
        rows: walker.current_rows().await?,
        warnings: walker.take_warnings(),
    })
}
