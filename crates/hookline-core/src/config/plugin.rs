//! Plugin system configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Plugin discovery and lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Base directories searched for plugin modules, in order.
    #[serde(default = "default_plugin_directories")]
    pub directories: Vec<String>,
    /// Whether to import every module found in the directories on startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,
    /// Whether to initialize all imported plugins right after loading.
    #[serde(default = "default_true")]
    pub auto_init: bool,
}

impl PluginConfig {
    /// Returns the configured base directories as paths.
    pub fn directory_paths(&self) -> Vec<PathBuf> {
        self.directories.iter().map(PathBuf::from).collect()
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directories: default_plugin_directories(),
            auto_load: true,
            auto_init: true,
        }
    }
}

/// Hook dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    /// Upper bound for a single subscriber call, in seconds. `0` disables it.
    #[serde(default = "default_subscriber_timeout")]
    pub subscriber_timeout_seconds: u64,
}

impl HookConfig {
    /// Returns the subscriber timeout, or `None` when disabled.
    pub fn subscriber_timeout(&self) -> Option<Duration> {
        match self.subscriber_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            subscriber_timeout_seconds: default_subscriber_timeout(),
        }
    }
}

fn default_plugin_directories() -> Vec<String> {
    vec!["./plugins".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_subscriber_timeout() -> u64 {
    30
}
