//! What a plugin module declares about itself.
//!
//! A plugin module is a factory: the manager calls it with a context value
//! and gets back a [`PluginDeclaration`]. Every field is optional; missing
//! lifecycle methods are no-ops and the priority defaults to 100.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

use hookline_core::result::AppResult;

use crate::hooks::definitions::HookHandler;

/// A loadable plugin module.
///
/// Module identity is the identity of the `Arc` holding it: importing the
/// same `Arc` twice under one name is a no-op, while two different modules
/// with the same name collide.
pub trait PluginModule: Send + Sync {
    /// Builds the plugin declaration for the given context.
    fn declare(&self, context: &Value) -> AppResult<PluginDeclaration>;
}

impl<F> PluginModule for F
where
    F: Fn(&Value) -> AppResult<PluginDeclaration> + Send + Sync,
{
    fn declare(&self, context: &Value) -> AppResult<PluginDeclaration> {
        self(context)
    }
}

/// Wraps a factory closure into a shareable plugin module.
pub fn module_fn<F>(factory: F) -> Arc<dyn PluginModule>
where
    F: Fn(&Value) -> AppResult<PluginDeclaration> + Send + Sync + 'static,
{
    Arc::new(factory)
}

/// Returns whether two module handles point at the same module.
pub(crate) fn same_module(a: &Arc<dyn PluginModule>, b: &Arc<dyn PluginModule>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// A plugin lifecycle method (`init`, `require`, `stop`, or `settings`).
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    /// Runs the method with the arguments given by the host.
    async fn call(&self, args: &[Value]) -> AppResult<Value>;
}

type LifecycleFnBox = dyn Fn(Vec<Value>) -> BoxFuture<'static, AppResult<Value>> + Send + Sync;

/// A closure-based lifecycle method.
pub struct ClosureLifecycle {
    /// Method body.
    body: Box<LifecycleFnBox>,
}

impl ClosureLifecycle {
    /// Creates a new closure-based lifecycle method.
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Value>> + Send + 'static,
    {
        Self {
            body: Box::new(move |args| Box::pin(body(args))),
        }
    }
}

impl fmt::Debug for ClosureLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureLifecycle")
            .field("body", &"<closure>")
            .finish()
    }
}

#[async_trait]
impl LifecycleHandler for ClosureLifecycle {
    async fn call(&self, args: &[Value]) -> AppResult<Value> {
        (self.body)(args.to_vec()).await
    }
}

/// Wraps an async closure into a shareable lifecycle method.
pub fn lifecycle_fn<F, Fut>(body: F) -> Arc<dyn LifecycleHandler>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<Value>> + Send + 'static,
{
    Arc::new(ClosureLifecycle::new(body))
}

/// A hook subscription declared by a plugin.
#[derive(Clone)]
pub struct HookBinding {
    /// The handler subscribed to the hook.
    pub handler: Arc<dyn HookHandler>,
    /// Per-hook priority; `None` inherits the plugin priority.
    pub priority: Option<i32>,
}

impl fmt::Debug for HookBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookBinding")
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Everything a plugin module declares.
#[derive(Default, Clone)]
pub struct PluginDeclaration {
    /// Plugin name; overrides the name derived from the file name.
    pub name: Option<String>,
    /// Plugin priority (lower = initialized and subscribed earlier).
    pub priority: Option<i32>,
    /// Runs on activation.
    pub init: Option<Arc<dyn LifecycleHandler>>,
    /// Runs when an already active plugin is required again.
    pub require: Option<Arc<dyn LifecycleHandler>>,
    /// Runs on deactivation.
    pub stop: Option<Arc<dyn LifecycleHandler>>,
    /// Settings accessor, callable regardless of state.
    pub settings: Option<Arc<dyn LifecycleHandler>>,
    /// Hook name → subscription, in declaration order.
    pub hooks: Vec<(String, HookBinding)>,
    /// Surface exposed on the plugin façade at all times.
    pub public: Map<String, Value>,
    /// Surface exposed on the plugin façade only while active.
    pub public_if_active: Map<String, Value>,
}

impl PluginDeclaration {
    /// Creates an empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty declaration with a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().with_name(name)
    }

    /// Sets the plugin name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the plugin priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the `init` method.
    pub fn on_init(mut self, handler: Arc<dyn LifecycleHandler>) -> Self {
        self.init = Some(handler);
        self
    }

    /// Sets the `require` method.
    pub fn on_require(mut self, handler: Arc<dyn LifecycleHandler>) -> Self {
        self.require = Some(handler);
        self
    }

    /// Sets the `stop` method.
    pub fn on_stop(mut self, handler: Arc<dyn LifecycleHandler>) -> Self {
        self.stop = Some(handler);
        self
    }

    /// Sets the `settings` method.
    pub fn on_settings(mut self, handler: Arc<dyn LifecycleHandler>) -> Self {
        self.settings = Some(handler);
        self
    }

    /// Subscribes `handler` to `hook` with the plugin priority.
    ///
    /// Declaring the same hook twice replaces the earlier handler.
    pub fn hook(self, hook: impl Into<String>, handler: Arc<dyn HookHandler>) -> Self {
        self.bind(hook.into(), HookBinding {
            handler,
            priority: None,
        })
    }

    /// Subscribes `handler` to `hook` with its own priority.
    pub fn hook_with_priority(
        self,
        hook: impl Into<String>,
        handler: Arc<dyn HookHandler>,
        priority: i32,
    ) -> Self {
        self.bind(hook.into(), HookBinding {
            handler,
            priority: Some(priority),
        })
    }

    /// Adds an always-visible public value.
    pub fn public(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.public.insert(key.into(), value.into());
        self
    }

    /// Adds a public value visible only while the plugin is active.
    pub fn public_if_active(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.public_if_active.insert(key.into(), value.into());
        self
    }

    fn bind(mut self, hook: String, binding: HookBinding) -> Self {
        match self.hooks.iter_mut().find(|(name, _)| *name == hook) {
            Some((_, existing)) => *existing = binding,
            None => self.hooks.push((hook, binding)),
        }
        self
    }
}

impl fmt::Debug for PluginDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDeclaration")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field(
                "hooks",
                &self.hooks.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("public", &self.public)
            .field("public_if_active", &self.public_if_active)
            .finish_non_exhaustive()
    }
}
