//! Plugin manager. Imports plugin modules, drives their lifecycle, and
//! fires hooks for the host application.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use hookline_core::config::AppConfig;
use hookline_core::error::AppError;

use crate::declaration::PluginModule;
use crate::error::PluginError;
use crate::hooks::definitions::Dispatch;
use crate::hooks::hook::Hook;
use crate::loader::ModuleLoader;
use crate::plugin::{Plugin, PluginRecord};
use crate::registry::Registry;

/// Where [`PluginManager::plugin`] gets a plugin from.
pub enum PluginSource {
    /// A module value, imported without touching the filesystem.
    Module(Arc<dyn PluginModule>),
    /// A registered plugin name, or else a module path.
    Named(String),
}

impl From<Arc<dyn PluginModule>> for PluginSource {
    fn from(module: Arc<dyn PluginModule>) -> Self {
        Self::Module(module)
    }
}

impl From<&str> for PluginSource {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for PluginSource {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// A plugin whose lifecycle method failed during a bulk operation.
#[derive(Debug, Clone)]
pub struct LifecycleFailure {
    /// Plugin name.
    pub plugin: String,
    /// What went wrong.
    pub error: AppError,
}

/// Outcome of [`PluginManager::init_all`] or [`PluginManager::stop_all`].
#[derive(Debug, Clone, Default)]
pub struct LifecycleReport {
    /// Plugins processed successfully, in processing order.
    pub succeeded: Vec<String>,
    /// Plugins whose lifecycle method failed.
    pub failed: Vec<LifecycleFailure>,
}

impl LifecycleReport {
    /// Returns whether every plugin succeeded.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Manages plugin import and lifecycle, and exposes hook dispatch.
pub struct PluginManager {
    /// Hooks and plugins of this manager.
    registry: Arc<Registry>,
    /// Turns module files into modules.
    loader: Arc<dyn ModuleLoader>,
}

impl PluginManager {
    /// Creates a manager with an empty registry and no plugin directories.
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            loader,
        }
    }

    /// Creates a manager from application configuration.
    pub fn from_config(config: &AppConfig, loader: Arc<dyn ModuleLoader>) -> Self {
        let registry = Registry::with_config(&config.hooks);
        registry.set_directories(config.plugins.directory_paths());

        Self {
            registry: Arc::new(registry),
            loader,
        }
    }

    /// Replaces the plugin base directories.
    pub fn with_directories(self, directories: Vec<PathBuf>) -> Self {
        self.registry.set_directories(directories);
        self
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Imports one module file and returns its façade.
    ///
    /// The path is resolved against the plugin directories; the file stem is
    /// the default plugin name.
    pub fn import(&self, path: impl AsRef<Path>, context: Option<&Value>) -> Result<Plugin, PluginError> {
        let extensions = self.loader.extensions();
        let extensions: Vec<&str> = extensions.iter().map(String::as_str).collect();
        let resolved = self.registry.resolve_path(path.as_ref(), &extensions)?;

        let module = self
            .loader
            .load(&resolved)
            .map_err(|source| PluginError::Load {
                path: resolved.clone(),
                source,
            })?;

        let default_name = resolved
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string);

        info!(path = %resolved.display(), "Importing plugin module");
        self.register(module, default_name.as_deref(), context)
    }

    /// Imports a module value directly.
    pub fn import_module(
        &self,
        module: Arc<dyn PluginModule>,
        context: Option<&Value>,
    ) -> Result<Plugin, PluginError> {
        self.register(module, None, context)
    }

    /// Imports every loadable file in `dir`, or in every plugin directory
    /// when `dir` is `None`.
    ///
    /// Files are imported in file-name order. The first failure aborts the
    /// scan.
    pub fn import_all(&self, context: Option<&Value>, dir: Option<&Path>) -> Result<&Self, PluginError> {
        let dirs = match dir {
            Some(dir) => vec![self.absolute_dir(dir)],
            None => self.registry.directories(),
        };

        for dir in dirs {
            if !dir.is_dir() {
                warn!(dir = %dir.display(), "Plugin directory does not exist, skipping");
                continue;
            }

            let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && self.loader.accepts(path))
                .collect();
            files.sort();

            for file in files {
                self.import(&file, context)?;
            }
        }

        Ok(self)
    }

    /// Imports a module, or returns the façade of an already registered
    /// plugin.
    pub fn plugin(
        &self,
        source: impl Into<PluginSource>,
        context: Option<&Value>,
    ) -> Result<Plugin, PluginError> {
        match source.into() {
            PluginSource::Module(module) => self.import_module(module, context),
            PluginSource::Named(name) => match self.registry.get(&name) {
                Some(record) => Ok(Plugin::new(record, self.registry.clone())),
                None => self.import(&name, context),
            },
        }
    }

    /// Fires a hook in parallel. This is the default way to run a hook.
    pub fn hook(&self, name: &str, args: Vec<Value>) -> Result<Dispatch<Vec<Value>>, PluginError> {
        Ok(self.registry.hook(name)?.parallel(args))
    }

    /// Fires a hook in series.
    pub fn series(&self, name: &str, args: Vec<Value>) -> Result<Dispatch<bool>, PluginError> {
        Ok(self.registry.hook(name)?.series(args))
    }

    /// Fires a hook as a waterfall.
    pub fn waterfall(&self, name: &str, args: Vec<Value>) -> Result<Dispatch<Value>, PluginError> {
        Ok(self.registry.hook(name)?.waterfall(args))
    }

    /// Returns the hook object, creating it if needed.
    pub fn manage_hook(&self, name: &str) -> Result<Arc<Hook>, PluginError> {
        self.registry.hook(name)
    }

    /// Same as [`PluginManager::manage_hook`].
    pub fn run_hook(&self, name: &str) -> Result<Arc<Hook>, PluginError> {
        self.manage_hook(name)
    }

    /// Initializes every registered plugin in priority order.
    ///
    /// A plugin whose `init` or subscription fails is left inactive with no
    /// subscriptions and is reported; the remaining plugins are still
    /// initialized.
    pub async fn init_all(&self, args: &[Value]) -> LifecycleReport {
        let mut records = self.registry.plugins();
        records.sort_by_key(|r| r.priority());

        let mut report = LifecycleReport::default();
        for record in records {
            let outcome = match record.run_init(args).await {
                Ok(_) => record.subscribe(&self.registry).map_err(AppError::from),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    record.set_active(true);
                    report.succeeded.push(record.name().to_string());
                }
                Err(e) => {
                    record.unsubscribe(&self.registry);
                    record.set_active(false);
                    error!(plugin = %record.name(), error = %e, "Plugin init failed");
                    report.failed.push(LifecycleFailure {
                        plugin: record.name().to_string(),
                        error: e,
                    });
                }
            }
        }

        info!(
            initialized = report.succeeded.len(),
            failed = report.failed.len(),
            "Plugins initialized"
        );
        report
    }

    /// Stops every active plugin in import order.
    ///
    /// A failing `stop` is reported, and the plugin is still deactivated and
    /// unsubscribed.
    pub async fn stop_all(&self, args: &[Value]) -> LifecycleReport {
        let mut report = LifecycleReport::default();

        for record in self.registry.plugins() {
            if !record.is_active() {
                continue;
            }

            let outcome = record.run_stop(args).await;
            record.set_active(false);
            record.unsubscribe(&self.registry);

            match outcome {
                Ok(_) => report.succeeded.push(record.name().to_string()),
                Err(e) => {
                    warn!(plugin = %record.name(), error = %e, "Plugin stop returned error");
                    report.failed.push(LifecycleFailure {
                        plugin: record.name().to_string(),
                        error: e,
                    });
                }
            }
        }

        info!(stopped = report.succeeded.len(), "All plugins stopped");
        report
    }

    /// Clears all hooks and plugins.
    pub fn reset(&self) -> &Self {
        self.registry.reset();
        self
    }

    /// Returns façades for all plugins, in import order.
    pub fn all_plugins(&self) -> Vec<Plugin> {
        self.facades(|_| true)
    }

    /// Returns façades for active plugins.
    pub fn active_plugins(&self) -> Vec<Plugin> {
        self.facades(|r| r.is_active())
    }

    /// Returns façades for inactive plugins.
    pub fn inactive_plugins(&self) -> Vec<Plugin> {
        self.facades(|r| !r.is_active())
    }

    fn facades(&self, keep: impl Fn(&PluginRecord) -> bool) -> Vec<Plugin> {
        self.registry
            .plugins()
            .into_iter()
            .filter(|r| keep(r))
            .map(|r| Plugin::new(r, self.registry.clone()))
            .collect()
    }

    fn register(
        &self,
        module: Arc<dyn PluginModule>,
        default_name: Option<&str>,
        context: Option<&Value>,
    ) -> Result<Plugin, PluginError> {
        let record = PluginRecord::new(module, default_name, context)?;
        let record = self.registry.register(record)?;
        Ok(Plugin::new(record, self.registry.clone()))
    }

    fn absolute_dir(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() || dir.exists() {
            return dir.to_path_buf();
        }
        self.registry
            .directories()
            .into_iter()
            .map(|base| base.join(dir))
            .find(|candidate| candidate.is_dir())
            .unwrap_or_else(|| dir.to_path_buf())
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
