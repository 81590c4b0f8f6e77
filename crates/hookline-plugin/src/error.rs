//! Error types for plugin loading, registration, and hook dispatch.
//!
//! Structural problems (bad arguments, missing names, collisions, loader
//! failures) are [`PluginError`]s and surface immediately. Failed hook
//! dispatches are [`HookError`]s; a veto is one of them, distinct from an
//! unexpected subscriber fault. Both map cleanly to
//! `hookline_core::error::AppError`.

use std::path::PathBuf;
use std::time::Duration;

use hookline_core::error::AppError;
use thiserror::Error;

/// Errors raised while building, registering, or loading plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// An argument failed validation (empty hook name, empty plugin name, ...).
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// The plugin module resolved no name.
    #[error("Cannot load plugin module without a name")]
    MissingName,

    /// Two distinct plugin modules were registered under the same name.
    #[error("Plugin name collision: multiple plugins named '{name}'")]
    NameCollision {
        /// The contested plugin name.
        name: String,
    },

    /// A module path did not resolve against any plugin directory.
    #[error("Plugin module '{}' not found in any plugin directory", .path.display())]
    NotFound {
        /// The path that was searched for.
        path: PathBuf,
    },

    /// The module loader could not produce a module for a path.
    #[error("Failed to load plugin module '{}': {source}", .path.display())]
    Load {
        /// The resolved module path.
        path: PathBuf,
        /// The loader's error.
        source: AppError,
    },

    /// The module factory itself returned an error.
    #[error("Plugin module '{name}' failed to declare itself: {source}")]
    Declaration {
        /// The default name the module was imported under, if any.
        name: String,
        /// The factory's error.
        source: AppError,
    },

    /// Listing a plugin directory failed.
    #[error("Plugin directory error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failed hook dispatch.
#[derive(Debug, Error)]
pub enum HookError {
    /// A subscriber returned `HookAction::Halt`.
    #[error("Hook '{hook}' halted by {}", .plugin.as_deref().unwrap_or("an anonymous subscriber"))]
    Vetoed {
        /// Hook name.
        hook: String,
        /// Owning plugin of the vetoing subscriber.
        plugin: Option<String>,
    },

    /// A subscriber returned an error.
    #[error("Subscriber of hook '{hook}' ({}) failed: {source}", .plugin.as_deref().unwrap_or("anonymous"))]
    Failed {
        /// Hook name.
        hook: String,
        /// Owning plugin of the failing subscriber.
        plugin: Option<String>,
        /// The subscriber's error.
        source: AppError,
    },

    /// A subscriber exceeded the configured timeout.
    #[error("Subscriber of hook '{hook}' ({}) timed out after {timeout:?}", .plugin.as_deref().unwrap_or("anonymous"))]
    TimedOut {
        /// Hook name.
        hook: String,
        /// Owning plugin of the slow subscriber.
        plugin: Option<String>,
        /// The timeout that elapsed.
        timeout: Duration,
    },
}

impl HookError {
    /// Returns the hook the failure happened on.
    pub fn hook(&self) -> &str {
        match self {
            Self::Vetoed { hook, .. } | Self::Failed { hook, .. } | Self::TimedOut { hook, .. } => {
                hook
            }
        }
    }

    /// Returns the owning plugin of the subscriber that ended the dispatch.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::Vetoed { plugin, .. }
            | Self::Failed { plugin, .. }
            | Self::TimedOut { plugin, .. } => plugin.as_deref(),
        }
    }

    /// Returns whether this failure is a deliberate veto.
    pub fn is_veto(&self) -> bool {
        matches!(self, Self::Vetoed { .. })
    }
}

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        match err {
            PluginError::Validation(_) | PluginError::MissingName => {
                AppError::validation(err.to_string())
            }
            PluginError::NameCollision { .. } => AppError::conflict(err.to_string()),
            PluginError::NotFound { .. } => AppError::not_found(err.to_string()),
            PluginError::Io(io) => AppError::from(io),
            _ => AppError::plugin(err.to_string()),
        }
    }
}

impl From<HookError> for AppError {
    fn from(err: HookError) -> Self {
        match err {
            HookError::TimedOut { .. } => AppError::timeout(err.to_string()),
            _ => AppError::hook(err.to_string()),
        }
    }
}
