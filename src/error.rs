use crate::driver::DriverError;
use crate::session::SessionState;

/// Errors that terminate a collection stage or the whole job.
///
/// Failures scoped to a single data unit (one row, one consolidation item)
/// are not represented here; they are typed separately and recovered at the
/// unit boundary.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Programmer error: an operation was invoked in the wrong session state
    /// (for example attaching a driver before manual login was observed).
    #[error("illegal session state: {operation} requires {required:?}, session is {found:?}")]
    SessionState {
        operation: &'static str,
        required: SessionState,
        found: SessionState,
    },

    /// Manual login was not observed on the debug endpoint in time.
    /// Carries the last observed tab URLs so the operator can diagnose
    /// where the browser actually is.
    #[error("manual login not observed within {timeout_secs}s; last observed urls: {last_urls:?}")]
    LoginTimeout {
        timeout_secs: u64,
        last_urls: Vec<String>,
    },

    /// A required UI state never appeared.
    #[error("checkpoint timed out waiting for {locator}{}", text_detail(.expected_text, .observed_text))]
    CheckpointTimeout {
        locator: String,
        expected_text: Option<String>,
        observed_text: Option<String>,
    },

    /// The browser process could not be started or its debug port never
    /// became reachable.
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

fn text_detail(expected: &Option<String>, observed: &Option<String>) -> String {
    match (expected, observed) {
        (Some(e), Some(o)) => format!(" (expected text {e:?}, observed {o:?})"),
        (Some(e), None) => format!(" (expected text {e:?}, element never appeared)"),
        _ => String::new(),
    }
}

/// A single row that could not be turned into a valid record.
///
/// Recovered at the extraction loop: logged with enough context to replay
/// manually, then skipped.
#[derive(Debug, Clone, thiserror::Error)]
#[error("row {row} of partition {partition}: {reason}")]
pub struct ExtractionFailure {
    pub partition: String,
    pub row: usize,
    pub reason: String,
}

/// Non-fatal outcomes recorded in the job report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionWarning {
    /// A paged listing reported more (or fewer) pages than were walked.
    PaginationCoverage {
        partition: String,
        discovered_pages: usize,
        walked_pages: usize,
    },
    /// A virtualized listing stopped loading before reaching its reported
    /// total; extraction still ran over what loaded.
    PartialMaterialization {
        partition: String,
        reported: usize,
        loaded: usize,
        reason: StallReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StallReason {
    Stagnation,
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_timeout_names_expected_and_observed_text() {
        let err = ScrapeError::CheckpointTimeout {
            locator: "xpath=//span".to_string(),
            expected_text: Some("Planejamento".to_string()),
            observed_text: Some("Carregando".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("xpath=//span"));
        assert!(msg.contains("Planejamento"));
        assert!(msg.contains("Carregando"));
    }

    #[test]
    fn login_timeout_reports_last_urls() {
        let err = ScrapeError::LoginTimeout {
            timeout_secs: 600,
            last_urls: vec!["https://example/login".to_string()],
        };
        assert!(err.to_string().contains("example/login"));
    }
}
