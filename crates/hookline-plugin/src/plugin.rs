//! Plugin backing records and the public plugin façade.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Map, Value};
use tracing::{debug, info};

use hookline_core::result::AppResult;

use crate::declaration::{HookBinding, LifecycleHandler, PluginModule};
use crate::error::PluginError;
use crate::hooks::definitions::DEFAULT_PRIORITY;
use crate::registry::Registry;

/// Backing state of an imported plugin module.
pub struct PluginRecord {
    /// The module this record was built from.
    module: Arc<dyn PluginModule>,
    /// Resolved plugin name.
    name: String,
    /// Plugin priority (lower = earlier).
    priority: i32,
    /// Whether the plugin is active.
    active: AtomicBool,
    /// Lifecycle methods; `None` is a no-op.
    init: Option<Arc<dyn LifecycleHandler>>,
    require: Option<Arc<dyn LifecycleHandler>>,
    stop: Option<Arc<dyn LifecycleHandler>>,
    settings: Option<Arc<dyn LifecycleHandler>>,
    /// Hook name → subscription, in declaration order.
    hooks: Vec<(String, HookBinding)>,
    /// Always-visible public surface.
    public: Map<String, Value>,
    /// Public surface visible while active.
    public_if_active: Map<String, Value>,
}

impl PluginRecord {
    /// Runs the module factory and merges its declaration over the defaults.
    ///
    /// `default_name` is used when the declaration names no plugin; one of
    /// the two must yield a non-empty name. A missing context becomes an
    /// empty JSON object.
    pub fn new(
        module: Arc<dyn PluginModule>,
        default_name: Option<&str>,
        context: Option<&Value>,
    ) -> Result<Self, PluginError> {
        let context = context
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let declaration = module
            .declare(&context)
            .map_err(|source| PluginError::Declaration {
                name: default_name.unwrap_or("<unnamed>").to_string(),
                source,
            })?;

        let name = declaration
            .name
            .or_else(|| default_name.map(str::to_string))
            .filter(|n| !n.trim().is_empty())
            .ok_or(PluginError::MissingName)?;

        if declaration.hooks.iter().any(|(hook, _)| hook.trim().is_empty()) {
            return Err(PluginError::Validation(format!(
                "plugin '{name}' declares a hook with an empty name"
            )));
        }

        debug!(plugin = %name, hooks = declaration.hooks.len(), "Plugin module declared");

        Ok(Self {
            module,
            name,
            priority: declaration.priority.unwrap_or(DEFAULT_PRIORITY),
            active: AtomicBool::new(false),
            init: declaration.init,
            require: declaration.require,
            stop: declaration.stop,
            settings: declaration.settings,
            hooks: declaration.hooks,
            public: declaration.public,
            public_if_active: declaration.public_if_active,
        })
    }

    /// Returns the plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugin priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the module this record was built from.
    pub fn module(&self) -> &Arc<dyn PluginModule> {
        &self.module
    }

    /// Returns whether the plugin is active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Returns the names of the hooks this plugin subscribes to.
    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Returns the always-visible public surface.
    pub fn public(&self) -> &Map<String, Value> {
        &self.public
    }

    /// Returns the public surface visible while active.
    pub fn public_if_active(&self) -> &Map<String, Value> {
        &self.public_if_active
    }

    pub(crate) async fn run_init(&self, args: &[Value]) -> AppResult<Value> {
        call_optional(&self.init, args).await
    }

    pub(crate) async fn run_require(&self, args: &[Value]) -> AppResult<Value> {
        call_optional(&self.require, args).await
    }

    pub(crate) async fn run_stop(&self, args: &[Value]) -> AppResult<Value> {
        call_optional(&self.stop, args).await
    }

    pub(crate) async fn run_settings(&self, args: &[Value]) -> AppResult<Value> {
        call_optional(&self.settings, args).await
    }

    /// Subscribes every declared hook handler, creating hooks as needed.
    ///
    /// Not idempotent: a second call subscribes every handler again.
    pub fn subscribe(&self, registry: &Registry) -> Result<(), PluginError> {
        for (hook_name, binding) in &self.hooks {
            let priority = binding.priority.unwrap_or(self.priority);
            registry.hook(hook_name)?.subscribe(
                binding.handler.clone(),
                priority,
                Some(&self.name),
            )?;
        }
        debug!(plugin = %self.name, hooks = self.hooks.len(), "Plugin hooks subscribed");
        Ok(())
    }

    /// Removes every declared hook handler from the hooks that exist.
    pub fn unsubscribe(&self, registry: &Registry) {
        for (hook_name, binding) in &self.hooks {
            if let Some(hook) = registry.find_hook(hook_name) {
                hook.unsubscribe(&binding.handler);
            }
        }
        debug!(plugin = %self.name, "Plugin hooks unsubscribed");
    }
}

async fn call_optional(
    handler: &Option<Arc<dyn LifecycleHandler>>,
    args: &[Value],
) -> AppResult<Value> {
    match handler {
        Some(handler) => handler.call(args).await,
        None => Ok(Value::Null),
    }
}

impl fmt::Debug for PluginRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRecord")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("active", &self.is_active())
            .field("hooks", &self.hook_names())
            .finish_non_exhaustive()
    }
}

/// Host-facing handle to a plugin.
///
/// Exposes the plugin's public surface and drives its lifecycle. Cheap to
/// rebuild: the manager hands out a fresh façade on every lookup.
#[derive(Clone)]
pub struct Plugin {
    /// Backing record.
    record: Arc<PluginRecord>,
    /// Registry the plugin's hooks live in.
    registry: Arc<Registry>,
    /// Current public surface.
    surface: Map<String, Value>,
}

impl Plugin {
    /// Builds a façade over a registered record.
    pub fn new(record: Arc<PluginRecord>, registry: Arc<Registry>) -> Self {
        let mut surface = record.public().clone();
        if record.is_active() {
            surface.extend(record.public_if_active().clone());
        }

        Self {
            record,
            registry,
            surface,
        }
    }

    /// Returns the plugin name.
    pub fn name(&self) -> &str {
        self.record.name()
    }

    /// Returns the plugin priority.
    pub fn priority(&self) -> i32 {
        self.record.priority()
    }

    /// Returns whether the plugin is active.
    pub fn is_active(&self) -> bool {
        self.record.is_active()
    }

    /// Returns the backing record.
    pub fn record(&self) -> &Arc<PluginRecord> {
        &self.record
    }

    /// Returns a public surface value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.surface.get(key)
    }

    /// Returns the whole public surface.
    pub fn surface(&self) -> &Map<String, Value> {
        &self.surface
    }

    /// Runs `init`, subscribes the plugin's hooks, and activates it.
    ///
    /// Always runs `init`; on an active plugin this subscribes the hooks a
    /// second time. Use [`Plugin::require`] for idempotent activation.
    pub async fn init(&mut self, args: &[Value]) -> AppResult<&mut Self> {
        info!(plugin = %self.name(), "Initializing plugin");
        self.activate(args).await?;
        Ok(self)
    }

    /// Activates the plugin if needed.
    ///
    /// An active plugin only runs its `require` method; an inactive one goes
    /// through the `init` path.
    pub async fn require(&mut self, args: &[Value]) -> AppResult<&mut Self> {
        if self.record.is_active() {
            debug!(plugin = %self.name(), "Plugin already active, running require");
            self.record.run_require(args).await?;
        } else {
            info!(plugin = %self.name(), "Requiring inactive plugin");
            self.activate(args).await?;
        }
        Ok(self)
    }

    /// Stops the plugin and removes its hook subscriptions.
    pub async fn stop(&mut self, args: &[Value]) -> AppResult<()> {
        if self.record.is_active() {
            info!(plugin = %self.name(), "Stopping plugin");
            self.record.run_stop(args).await?;
            self.record.unsubscribe(&self.registry);
        }
        self.record.set_active(false);

        for key in self.record.public_if_active().keys() {
            self.surface.remove(key);
        }
        Ok(())
    }

    /// Calls the plugin's `settings` method, whatever its state.
    pub async fn settings(&self, args: &[Value]) -> AppResult<Value> {
        self.record.run_settings(args).await
    }

    async fn activate(&mut self, args: &[Value]) -> AppResult<()> {
        self.record.run_init(args).await?;
        if let Err(e) = self.record.subscribe(&self.registry) {
            self.record.unsubscribe(&self.registry);
            self.record.set_active(false);
            for key in self.record.public_if_active().keys() {
                self.surface.remove(key);
            }
            return Err(e.into());
        }
        self.record.set_active(true);
        self.surface
            .extend(self.record.public_if_active().clone());
        Ok(())
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("record", &self.record)
            .field("surface", &self.surface)
            .finish()
    }
}
