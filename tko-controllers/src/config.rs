//! Controller configuration
//!
//! Intervals, the modification window handed to the store, and the settings
//! passed on to plugins.

use std::path::PathBuf;
use std::time::Duration;

use crate::plugins::{ApiAddress, PluginSettings};

/// Controller configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a deployment modification token stays valid
    pub modification_window: Duration,

    /// Wait between instantiation passes
    pub instantiation_interval: Duration,

    /// Wait between preparation passes
    pub preparation_interval: Duration,

    /// Approve deployments as soon as they are fully prepared
    pub auto_approve: bool,

    /// Callback address handed to plugins
    pub api: ApiAddress,

    /// Prepended to `PATH` for command plugins
    pub plugin_path: Option<PathBuf>,

    /// Where plugin log pipes are created
    pub log_pipe_dir: PathBuf,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - TKO_MODIFICATION_WINDOW (seconds, default: 5)
    /// - TKO_INSTANTIATION_INTERVAL (seconds, default: 3)
    /// - TKO_PREPARATION_INTERVAL (seconds, default: 3)
    /// - TKO_AUTO_APPROVE (true/false, default: false)
    /// - TKO_API_PROTOCOL, TKO_API_ADDRESS, TKO_API_PORT (default: tcp, localhost, 50050)
    /// - TKO_PLUGIN_PATH
    /// - TKO_LOG_PIPE_DIR (default: system temp dir)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let auto_approve = match std::env::var("TKO_AUTO_APPROVE") {
            Ok(value) => value
                .parse::<bool>()
                .map_err(|_| anyhow::anyhow!("TKO_AUTO_APPROVE must be true or false: {}", value))?,
            Err(_) => defaults.auto_approve,
        };

        let port = match std::env::var("TKO_API_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("TKO_API_PORT is not a port: {}", value))?,
            Err(_) => defaults.api.port,
        };

        Ok(Self {
            modification_window: seconds("TKO_MODIFICATION_WINDOW")?
                .unwrap_or(defaults.modification_window),
            instantiation_interval: seconds("TKO_INSTANTIATION_INTERVAL")?
                .unwrap_or(defaults.instantiation_interval),
            preparation_interval: seconds("TKO_PREPARATION_INTERVAL")?
                .unwrap_or(defaults.preparation_interval),
            auto_approve,
            api: ApiAddress {
                protocol: std::env::var("TKO_API_PROTOCOL").unwrap_or(defaults.api.protocol),
                address: std::env::var("TKO_API_ADDRESS").unwrap_or(defaults.api.address),
                port,
            },
            plugin_path: std::env::var_os("TKO_PLUGIN_PATH").map(PathBuf::from),
            log_pipe_dir: std::env::var_os("TKO_LOG_PIPE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_pipe_dir),
        })
    }

    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    pub fn with_plugin_path(mut self, plugin_path: impl Into<PathBuf>) -> Self {
        self.plugin_path = Some(plugin_path.into());
        self
    }

    /// Settings handed to every plugin invocation
    pub fn plugin_settings(&self) -> PluginSettings {
        PluginSettings {
            api: self.api.clone(),
            plugin_path: self.plugin_path.clone(),
            log_pipe_dir: self.log_pipe_dir.clone(),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.modification_window.is_zero() {
            anyhow::bail!("modification_window must be greater than 0");
        }

        if self.instantiation_interval.is_zero() {
            anyhow::bail!("instantiation_interval must be greater than 0");
        }

        if self.preparation_interval.is_zero() {
            anyhow::bail!("preparation_interval must be greater than 0");
        }

        if self.api.address.is_empty() {
            anyhow::bail!("api address cannot be empty");
        }

        if self.api.port == 0 {
            anyhow::bail!("api port must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modification_window: Duration::from_secs(5),
            instantiation_interval: Duration::from_secs(3),
            preparation_interval: Duration::from_secs(3),
            auto_approve: false,
            api: ApiAddress::default(),
            plugin_path: None,
            log_pipe_dir: std::env::temp_dir(),
        }
    }
}

fn seconds(name: &str) -> anyhow::Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| anyhow::anyhow!("{} must be a number of seconds: {}", name, value)),
        Err(_) => Ok(None),
    }
}
