mod broker;
mod debug_endpoint;

pub use broker::SessionBroker;
pub use debug_endpoint::{DebugEndpointClient, DebugTarget};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lifecycle of one browser automation session.
///
/// The driver is constructed only after `LoggedIn`; construction moves the
/// session to `Attached`. Credentials never pass through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Opening,
    AwaitingManualLogin,
    LoggedIn,
    Attached,
    Closed,
}

/// One browser automation session, owned by the job that opened it and
/// mutated only by the [`SessionBroker`].
#[derive(Debug)]
pub struct Session {
    pub debug_host: String,
    pub debug_port: u16,
    pub start_url: String,
    /// Persistent profile directory, so login survives across processes.
    /// `None` when attaching to a browser managed elsewhere.
    pub profile_dir: Option<PathBuf>,
    state: SessionState,
    browser_process: Option<std::process::Child>,
}

impl Session {
    pub(crate) fn new(
        debug_host: String,
        debug_port: u16,
        start_url: String,
        profile_dir: Option<PathBuf>,
        browser_process: Option<std::process::Child>,
    ) -> Self {
        Self {
            debug_host,
            debug_port,
            start_url,
            profile_dir,
            state: SessionState::Opening,
            browser_process,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn debug_address(&self) -> String {
        format!("{}:{}", self.debug_host, self.debug_port)
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub(crate) fn take_browser_process(&mut self) -> Option<std::process::Child> {
        self.browser_process.take()
    }
}
