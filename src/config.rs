use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_start_url() -> String {
    "http://www.comprasnet.gov.br/seguro/loginPortal.asp".to_string()
}

fn default_debug_host() -> String {
    "127.0.0.1".to_string()
}

fn default_debug_port() -> u16 {
    9222
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/110.0.0.0 Safari/537.36"
        .to_string()
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Login page opened for the operator.
    pub start_url: String,

    /// Exact URL that marks a completed login. When unset, a heuristic on
    /// the observed tab URLs is used instead.
    pub expected_post_login_url: Option<String>,

    /// DevTools debug endpoint address. For a containerized browser this is
    /// the service hostname; locally it is 127.0.0.1.
    pub debug_host: String,
    pub debug_port: u16,

    /// Launch a local browser process. When false, an already-running
    /// browser at `debug_host:debug_port` is targeted instead.
    pub launch_browser: bool,

    /// Persistent profile directory so login state survives across runs.
    /// Defaults to a per-user data dir.
    pub profile_dir: Option<PathBuf>,

    /// Explicit browser executable. When unset, well-known locations and
    /// PATH are searched.
    pub browser_executable: Option<PathBuf>,

    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_url: default_start_url(),
            expected_post_login_url: None,
            debug_host: default_debug_host(),
            debug_port: default_debug_port(),
            launch_browser: true,
            profile_dir: None,
            browser_executable: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Timeouts and poll periods for all bounded waits.
///
/// Stored as plain seconds/milliseconds so the TOML surface stays obvious.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// How long the operator has to complete manual login.
    pub login_timeout_secs: u64,
    /// Poll interval against the debug endpoint while waiting for login.
    pub login_poll_millis: u64,

    /// Default timeout for semantic checkpoints.
    pub checkpoint_timeout_secs: u64,
    /// Shorter sub-timeout for checkpoint text matching.
    pub checkpoint_text_timeout_secs: u64,

    /// Grace window in which a busy indicator may appear after an action.
    pub spinner_grace_millis: u64,
    /// How long a visible busy indicator may take to clear.
    pub spinner_timeout_secs: u64,

    /// Fixed poll period for all element waits, independent of timeout.
    pub poll_millis: u64,
    /// Backoff before the single safe-click retry.
    pub click_retry_backoff_millis: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            login_timeout_secs: 600,
            login_poll_millis: 400,
            checkpoint_timeout_secs: 30,
            checkpoint_text_timeout_secs: 10,
            spinner_grace_millis: 2000,
            spinner_timeout_secs: 60,
            poll_millis: 100,
            click_retry_backoff_millis: 500,
        }
    }
}

impl WaitConfig {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn login_poll(&self) -> Duration {
        Duration::from_millis(self.login_poll_millis)
    }

    pub fn checkpoint_timeout(&self) -> Duration {
        Duration::from_secs(self.checkpoint_timeout_secs)
    }

    pub fn checkpoint_text_timeout(&self) -> Duration {
        Duration::from_secs(self.checkpoint_text_timeout_secs)
    }

    pub fn spinner_grace(&self) -> Duration {
        Duration::from_millis(self.spinner_grace_millis)
    }

    pub fn spinner_timeout(&self) -> Duration {
        Duration::from_secs(self.spinner_timeout_secs)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_millis)
    }

    pub fn click_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.click_retry_backoff_millis)
    }
}

/// Virtualized-scroll materialization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Fixed scroll step applied to the listing container, in pixels.
    pub step_px: i64,
    /// Consecutive rounds without row-count growth before giving up.
    pub stagnation_rounds: usize,
    /// Overall materialization budget per partition.
    pub materialization_timeout_secs: u64,
    /// How long to poll the on-screen total counter for a non-empty value.
    pub counter_timeout_secs: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            step_px: 800,
            stagnation_rounds: 6,
            materialization_timeout_secs: 180,
            counter_timeout_secs: 20,
        }
    }
}

impl ScrollConfig {
    pub fn materialization_timeout(&self) -> Duration {
        Duration::from_secs(self.materialization_timeout_secs)
    }

    pub fn counter_timeout(&self) -> Duration {
        Duration::from_secs(self.counter_timeout_secs)
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from the config file
    /// location; if unset, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    pub session: SessionConfig,
    pub waits: WaitConfig,
    pub scroll: ScrollConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Config plus the resolved data directory.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub data_dir: PathBuf,
}

impl ResolvedConfig {
    /// Load from `path` if it exists, otherwise use defaults anchored at the
    /// current directory.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let config = Config::load(path)?;
            let base = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            let data_dir = match &config.data_dir {
                Some(dir) if dir.is_absolute() => dir.clone(),
                Some(dir) => base.join(dir),
                None => base.join("data"),
            };
            Ok(Self { config, data_dir })
        } else {
            let config = Config::default();
            let data_dir = std::env::current_dir()
                .context("Failed to resolve current directory")?
                .join("data");
            Ok(Self { config, data_dir })
        }
    }

    /// Persistent browser profile directory, created on demand.
    pub fn profile_dir(&self) -> Result<PathBuf> {
        let dir = match &self.config.session.profile_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .context("Could not find local data directory")?
                .join("pca-coleta")
                .join("profile"),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create profile dir: {}", dir.display()))?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.session.debug_port, 9222);
        assert!(config.session.launch_browser);
        assert_eq!(config.waits.login_timeout_secs, 600);
        assert_eq!(config.scroll.stagnation_rounds, 6);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [session]
            debug_host = "chrome-login"
            launch_browser = false

            [waits]
            login_timeout_secs = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.session.debug_host, "chrome-login");
        assert!(!config.session.launch_browser);
        assert_eq!(config.waits.login_timeout_secs, 120);
        assert_eq!(config.waits.poll_millis, 100);
        assert_eq!(config.scroll.step_px, 800);
    }
}
