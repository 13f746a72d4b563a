use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// A tab/page descriptor from the browser's debug endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DebugTarget {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub target_type: String,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: String,
}

/// Thin poll client over the remote debugging endpoint.
///
/// Deliberately has no retry logic of its own; callers decide how to treat a
/// transiently unreachable endpoint (a browser that is still booting).
#[derive(Debug, Clone)]
pub struct DebugEndpointClient {
    client: Client,
    base_url: String,
}

impl DebugEndpointClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .context("Failed to create debug endpoint HTTP client")?;
        Ok(Self {
            client,
            base_url: format!("http://{host}:{port}"),
        })
    }

    /// List open targets via `GET /json`.
    ///
    /// An unreachable endpoint or malformed body yields an empty list so
    /// login polling can keep going while the browser boots.
    pub async fn list_targets(&self) -> Vec<DebugTarget> {
        let url = format!("{}/json", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => match resp.json::<Vec<DebugTarget>>().await {
                Ok(targets) => targets,
                Err(e) => {
                    debug!(error = %e, "debug endpoint returned malformed target list");
                    Vec::new()
                }
            },
            Err(e) => {
                debug!(error = %e, "debug endpoint unreachable");
                Vec::new()
            }
        }
    }

    /// Ask the browser to open a new tab at `url` via `GET /json/new?{url}`.
    ///
    /// Best-effort: the operator can always navigate manually, so failure
    /// here is logged and swallowed.
    pub async fn open_tab(&self, url: &str) {
        let endpoint = format!("{}/json/new?{}", self.base_url, urlencoding::encode(url));
        match self.client.get(&endpoint).send().await {
            Ok(_) => debug!(url, "asked debug endpoint to open tab"),
            Err(e) => warn!(url, error = %e, "could not open tab via debug endpoint"),
        }
    }

    /// Fetch the browser-level websocket URL used to attach a driver.
    pub async fn websocket_url(&self) -> Result<String> {
        let url = format!("{}/json/version", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach debug endpoint at {url}"))?;
        let info: VersionInfo = resp
            .json()
            .await
            .context("Failed to parse /json/version response")?;
        Ok(info.web_socket_debugger_url)
    }

    /// True once the endpoint answers `/json/version`.
    pub async fn is_reachable(&self) -> bool {
        let url = format!("{}/json/version", self.base_url);
        matches!(self.client.get(&url).send().await, Ok(resp) if resp.status().is_success())
    }
}
