use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::{SessionConfig, WaitConfig};
use crate::driver::{CdpDriver, UiDriver};
use crate::error::ScrapeError;

use super::{DebugEndpointClient, Session, SessionState};

const BOOT_POLL: Duration = Duration::from_millis(200);

/// Owns the session lifecycle: launch or locate a browser with remote
/// debugging, watch the debug endpoint until the operator completes login,
/// then bind an automation driver by attaching to the running process.
///
/// The broker never navigates past the login page and never reads or passes
/// credentials.
pub struct SessionBroker {
    session_config: SessionConfig,
    waits: WaitConfig,
    profile_dir: Option<PathBuf>,
    endpoint: DebugEndpointClient,
}

impl SessionBroker {
    pub fn new(
        session_config: SessionConfig,
        waits: WaitConfig,
        profile_dir: Option<PathBuf>,
    ) -> Result<Self, ScrapeError> {
        let endpoint = DebugEndpointClient::new(&session_config.debug_host, session_config.debug_port)
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;
        Ok(Self {
            session_config,
            waits,
            profile_dir,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &DebugEndpointClient {
        &self.endpoint
    }

    /// Open a session at the configured start URL.
    ///
    /// Local variant: spawns a browser process with remote debugging bound
    /// to a persistent profile and waits for the debug port to come up.
    /// Remote variant: targets the already-running browser and asks its
    /// debug endpoint to open the login page (best-effort).
    pub async fn open(&self) -> Result<Session, ScrapeError> {
        let config = &self.session_config;
        let mut session = if config.launch_browser {
            let profile_dir = self.profile_dir.clone().ok_or_else(|| {
                ScrapeError::Launch("profile directory required to launch a browser".to_string())
            })?;
            let child = self.spawn_browser(&profile_dir)?;
            info!(
                port = config.debug_port,
                profile = %profile_dir.display(),
                "launched browser with remote debugging"
            );
            Session::new(
                config.debug_host.clone(),
                config.debug_port,
                config.start_url.clone(),
                Some(profile_dir),
                Some(child),
            )
        } else {
            info!(address = %format!("{}:{}", config.debug_host, config.debug_port),
                "targeting already-running browser");
            Session::new(
                config.debug_host.clone(),
                config.debug_port,
                config.start_url.clone(),
                None,
                None,
            )
        };

        self.wait_for_debug_port(&session).await?;

        if !config.launch_browser {
            // The remote browser may be sitting on a blank tab; point it at
            // the login page so the operator does not have to type the URL.
            self.endpoint.open_tab(&config.start_url).await;
        }

        session.set_state(SessionState::AwaitingManualLogin);
        Ok(session)
    }

    fn spawn_browser(&self, profile_dir: &PathBuf) -> Result<std::process::Child, ScrapeError> {
        let config = &self.session_config;
        let executable = match &config.browser_executable {
            Some(path) => path.display().to_string(),
            None => find_browser().ok_or_else(|| {
                ScrapeError::Launch(
                    "Chrome/Chromium not found; set session.browser_executable".to_string(),
                )
            })?,
        };

        Command::new(&executable)
            .arg(format!("--remote-debugging-port={}", config.debug_port))
            .arg(format!("--user-data-dir={}", profile_dir.display()))
            .arg("--profile-directory=Default")
            .arg(format!("--user-agent={}", config.user_agent))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--new-tab")
            .arg(&config.start_url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ScrapeError::Launch(format!("failed to start {executable}: {e}")))
    }

    async fn wait_for_debug_port(&self, session: &Session) -> Result<(), ScrapeError> {
        let deadline = Instant::now() + self.waits.checkpoint_timeout();
        while Instant::now() < deadline {
            if self.endpoint.is_reachable().await {
                return Ok(());
            }
            tokio::time::sleep(BOOT_POLL).await;
        }
        Err(ScrapeError::Launch(format!(
            "debug endpoint at {} never became reachable",
            session.debug_address()
        )))
    }

    /// Poll the debug endpoint until some open tab satisfies the post-login
    /// predicate, returning that tab's URL.
    ///
    /// Transient unreachability of the endpoint is tolerated silently: the
    /// poll just observes an empty target list and tries again.
    pub async fn await_manual_login(&self, session: &mut Session) -> Result<String, ScrapeError> {
        if session.state() != SessionState::AwaitingManualLogin {
            return Err(ScrapeError::SessionState {
                operation: "await_manual_login",
                required: SessionState::AwaitingManualLogin,
                found: session.state(),
            });
        }

        let timeout = self.waits.login_timeout();
        let deadline = Instant::now() + timeout;
        let mut last_urls: Vec<String> = Vec::new();

        info!(address = %session.debug_address(), "waiting for manual login");

        while Instant::now() < deadline {
            let targets = self.endpoint.list_targets().await;
            let urls: Vec<String> = targets
                .into_iter()
                .map(|t| t.url)
                .filter(|u| !u.is_empty())
                .collect();

            if !urls.is_empty() {
                last_urls = urls.clone();
                if last_urls.len() > 5 {
                    let excess = last_urls.len() - 5;
                    last_urls.drain(..excess);
                }
            }

            for url in &urls {
                if self.is_logged_in(url) {
                    info!(url, "post-login state detected");
                    session.set_state(SessionState::LoggedIn);
                    return Ok(url.clone());
                }
            }

            tokio::time::sleep(self.waits.login_poll()).await;
        }

        Err(ScrapeError::LoginTimeout {
            timeout_secs: timeout.as_secs(),
            last_urls,
        })
    }

    /// Post-login predicate over an observed tab URL: the configured exact
    /// URL when present, otherwise a heuristic over known login/post-login
    /// paths of the portal.
    fn is_logged_in(&self, url: &str) -> bool {
        if let Some(expected) = &self.session_config.expected_post_login_url {
            return url.trim().eq_ignore_ascii_case(expected.trim());
        }
        post_login_heuristic(url)
    }

    /// Attach an automation driver to the already-running, already-logged-in
    /// browser. Never creates a new browser window.
    pub async fn attach(&self, session: &mut Session) -> Result<CdpDriver, ScrapeError> {
        if session.state() != SessionState::LoggedIn {
            return Err(ScrapeError::SessionState {
                operation: "attach",
                required: SessionState::LoggedIn,
                found: session.state(),
            });
        }

        let ws_url = self
            .endpoint
            .websocket_url()
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;
        let driver = CdpDriver::connect(&ws_url).await?;
        driver.reset_context().await?;
        session.set_state(SessionState::Attached);
        info!(address = %session.debug_address(), "automation driver attached");
        Ok(driver)
    }

    /// Release the session: shut the driver down and, for a locally
    /// launched browser, reap the process handle. Safe to call on every
    /// exit path.
    pub async fn release(&self, session: &mut Session, driver: Option<CdpDriver>) {
        if let Some(driver) = driver {
            driver.shutdown().await;
        }
        if let Some(mut child) = session.take_browser_process() {
            // Leave the browser window open for the operator; just make sure
            // we do not leak a zombie if it already exited.
            if let Ok(Some(status)) = child.try_wait() {
                info!(%status, "browser process exited");
            }
        }
        session.set_state(SessionState::Closed);
    }
}

/// Heuristic used when no exact post-login URL is configured: the tab must
/// have left the login pages and be sitting on a known portal path.
pub fn post_login_heuristic(url: &str) -> bool {
    let u = url.to_lowercase();
    if u.contains("loginportal") {
        return false;
    }
    if u.contains("/seguro/login") && u.contains("comprasnet") {
        return false;
    }
    if u.contains("/inicio") {
        return true;
    }
    u.contains("comprasnet.gov.br") || u.contains("contratos.comprasnet.gov.br")
}

/// Find a Chrome/Chromium executable via PATH or well-known locations.
fn find_browser() -> Option<String> {
    for name in ["google-chrome", "google-chrome-stable", "chromium"] {
        if let Ok(output) = Command::new("which").arg(name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];
    for candidate in candidates {
        if std::path::Path::new(candidate).exists() {
            return Some(candidate.to_string());
        }
    }
    warn!("no browser executable found in PATH or well-known locations");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_rejects_login_pages() {
        assert!(!post_login_heuristic(
            "http://www.comprasnet.gov.br/seguro/loginPortal.asp"
        ));
        assert!(!post_login_heuristic(
            "https://www.comprasnet.gov.br/seguro/login?next=x"
        ));
    }

    #[test]
    fn heuristic_accepts_post_login_pages() {
        assert!(post_login_heuristic("https://contratos.comprasnet.gov.br/inicio"));
        assert!(post_login_heuristic("https://cnetmobile.estaleiro.serpro.gov.br/inicio"));
        assert!(post_login_heuristic("https://www.comprasnet.gov.br/painel"));
    }

    #[test]
    fn heuristic_ignores_unrelated_urls() {
        assert!(!post_login_heuristic("about:blank"));
        assert!(!post_login_heuristic("https://example.com/"));
    }
}
