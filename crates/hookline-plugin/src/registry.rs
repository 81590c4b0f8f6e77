//! Registry of the hooks, plugin records, and plugin directories of one manager.
//!
//! All registry tables sit behind a single lock so that registration,
//! hook creation, and reset never interleave.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use hookline_core::config::plugin::HookConfig;

use crate::declaration::same_module;
use crate::error::PluginError;
use crate::hooks::hook::Hook;
use crate::plugin::PluginRecord;

#[derive(Debug, Default)]
struct RegistryState {
    /// Hook name → hook.
    hooks: HashMap<String, Arc<Hook>>,
    /// Plugin records in import order.
    plugins: Vec<Arc<PluginRecord>>,
    /// Names of `plugins`.
    plugin_names: HashSet<String>,
}

/// Registry of hooks and plugins.
#[derive(Debug)]
pub struct Registry {
    /// Hook and plugin tables.
    state: RwLock<RegistryState>,
    /// Base directories for plugin modules.
    directories: RwLock<Vec<PathBuf>>,
    /// Per-subscriber timeout given to every new hook.
    subscriber_timeout: Option<Duration>,
}

impl Registry {
    /// Creates an empty registry without plugin directories or timeout.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            directories: RwLock::new(Vec::new()),
            subscriber_timeout: None,
        }
    }

    /// Creates an empty registry using the hook settings from configuration.
    pub fn with_config(config: &HookConfig) -> Self {
        Self {
            subscriber_timeout: config.subscriber_timeout(),
            ..Self::new()
        }
    }

    /// Replaces the plugin base directories.
    pub fn set_directories(&self, directories: Vec<PathBuf>) {
        *self.directories.write() = directories;
    }

    /// Returns the plugin base directories.
    pub fn directories(&self) -> Vec<PathBuf> {
        self.directories.read().clone()
    }

    /// Clears hooks and plugins. Directories are kept.
    ///
    /// Hooks and records handed out earlier keep working but are no longer
    /// reachable through the registry.
    pub fn reset(&self) {
        let mut state = self.state.write();
        *state = RegistryState::default();
        info!("Registry reset");
    }

    /// Registers a plugin record.
    ///
    /// Registering a record built from the same module under an existing
    /// name is a no-op that returns the record already registered. A
    /// different module under an existing name is a collision.
    pub fn register(&self, record: PluginRecord) -> Result<Arc<PluginRecord>, PluginError> {
        let mut state = self.state.write();

        if state.plugin_names.contains(record.name()) {
            let existing = state
                .plugins
                .iter()
                .find(|p| p.name() == record.name())
                .cloned();

            return match existing {
                Some(existing) if same_module(existing.module(), record.module()) => {
                    debug!(plugin = %record.name(), "Plugin already imported");
                    Ok(existing)
                }
                _ => Err(PluginError::NameCollision {
                    name: record.name().to_string(),
                }),
            };
        }

        info!(plugin = %record.name(), priority = record.priority(), "Registering plugin");

        let record = Arc::new(record);
        state.plugin_names.insert(record.name().to_string());
        state.plugins.push(record.clone());
        Ok(record)
    }

    /// Looks a plugin up by name.
    pub fn get(&self, name: &str) -> Option<Arc<PluginRecord>> {
        self.state
            .read()
            .plugins
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    /// Returns names held by more than one record.
    ///
    /// Always empty for registries filled through [`Registry::register`].
    pub fn duplicate_names(&self) -> Vec<String> {
        let state = self.state.read();
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for record in &state.plugins {
            if !seen.insert(record.name()) && !duplicates.iter().any(|d| d == record.name()) {
                duplicates.push(record.name().to_string());
            }
        }
        duplicates
    }

    /// Checks whether a plugin name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.state.read().plugin_names.contains(name)
    }

    /// Returns all plugin records in import order.
    pub fn plugins(&self) -> Vec<Arc<PluginRecord>> {
        self.state.read().plugins.clone()
    }

    /// Returns the number of registered plugins.
    pub fn plugin_count(&self) -> usize {
        self.state.read().plugins.len()
    }

    /// Returns the hook registered under `name`, creating it on first use.
    pub fn hook(&self, name: &str) -> Result<Arc<Hook>, PluginError> {
        if let Some(hook) = self.find_hook(name) {
            return Ok(hook);
        }

        let mut state = self.state.write();
        // Another caller may have created it between the two locks.
        if let Some(hook) = state.hooks.get(name) {
            return Ok(hook.clone());
        }

        let hook = Arc::new(Hook::new(name)?.with_timeout(self.subscriber_timeout));
        state.hooks.insert(name.to_string(), hook.clone());
        debug!(hook = %name, "Hook created");
        Ok(hook)
    }

    /// Returns the hook registered under `name` without creating it.
    pub fn find_hook(&self, name: &str) -> Option<Arc<Hook>> {
        self.state.read().hooks.get(name).cloned()
    }

    /// Returns the names of all registered hooks, sorted.
    pub fn hook_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().hooks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolves a module path against the base directories.
    ///
    /// Absolute paths are used as given. Relative paths are tried in every
    /// base directory in order; a path without extension is also tried with
    /// each of `extensions`.
    pub fn resolve_path(&self, path: &Path, extensions: &[&str]) -> Result<PathBuf, PluginError> {
        let bases = if path.is_absolute() {
            vec![PathBuf::new()]
        } else {
            let dirs = self.directories();
            if dirs.is_empty() { vec![PathBuf::new()] } else { dirs }
        };

        for base in bases {
            let candidate = base.join(path);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if candidate.extension().is_none() {
                for ext in extensions {
                    let with_ext = candidate.with_extension(ext);
                    if with_ext.is_file() {
                        return Ok(with_ext);
                    }
                }
            }
        }

        Err(PluginError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
