//! A named hook point and its priority-ordered subscribers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::definitions::{HookAction, HookHandler, same_handler};
use crate::error::{HookError, PluginError};

/// A handler subscribed to a hook.
#[derive(Clone)]
pub(crate) struct Subscriber {
    /// The handler.
    pub(crate) handler: Arc<dyn HookHandler>,
    /// Priority (lower = earlier execution).
    pub(crate) priority: i32,
    /// Plugin that subscribed this handler.
    pub(crate) plugin: Option<String>,
}

impl Subscriber {
    /// Runs the handler, mapping a veto, an error, or a timeout into a
    /// [`HookError`].
    pub(crate) async fn invoke(
        &self,
        hook: &str,
        args: &[Value],
        timeout: Option<Duration>,
    ) -> Result<Value, HookError> {
        let call = self.handler.handle(args);
        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                HookError::TimedOut {
                    hook: hook.to_string(),
                    plugin: self.plugin.clone(),
                    timeout: limit,
                }
            })?,
            None => call.await,
        };

        match outcome {
            Ok(HookAction::Continue(value)) => Ok(value),
            Ok(HookAction::Halt) => {
                debug!(
                    hook = %hook,
                    plugin = self.plugin.as_deref().unwrap_or("-"),
                    "Subscriber halted dispatch"
                );
                Err(HookError::Vetoed {
                    hook: hook.to_string(),
                    plugin: self.plugin.clone(),
                })
            }
            Err(source) => Err(HookError::Failed {
                hook: hook.to_string(),
                plugin: self.plugin.clone(),
                source,
            }),
        }
    }
}

/// Diagnostic view of one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberInfo {
    /// Subscription priority.
    pub priority: i32,
    /// Owning plugin, if any.
    pub plugin: Option<String>,
}

/// One named extension point.
///
/// Subscribers are kept in subscribe order and stably sorted by priority at
/// the start of every dispatch, so equal priorities run in subscribe order.
pub struct Hook {
    /// Hook name.
    name: String,
    /// Subscribers in subscribe order (re-sorted on dispatch).
    pub(crate) subscribers: RwLock<Vec<Subscriber>>,
    /// Upper bound for a single subscriber call.
    pub(crate) timeout: Option<Duration>,
}

impl Hook {
    /// Creates a new empty hook.
    pub fn new(name: impl Into<String>) -> Result<Self, PluginError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PluginError::Validation(
                "hook name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            name,
            subscribers: RwLock::new(Vec::new()),
            timeout: None,
        })
    }

    /// Sets the per-subscriber timeout used by every dispatch.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the hook name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a handler to the hook.
    ///
    /// `plugin` tags the subscription for diagnostics and veto reporting.
    pub fn subscribe(
        &self,
        handler: Arc<dyn HookHandler>,
        priority: i32,
        plugin: Option<&str>,
    ) -> Result<&Self, PluginError> {
        if plugin.is_some_and(|p| p.trim().is_empty()) {
            return Err(PluginError::Validation(
                "plugin name must not be empty".to_string(),
            ));
        }

        self.subscribers.write().push(Subscriber {
            handler,
            priority,
            plugin: plugin.map(str::to_string),
        });

        info!(
            hook = %self.name,
            plugin = plugin.unwrap_or("-"),
            priority = priority,
            "Hook handler subscribed"
        );

        Ok(self)
    }

    /// Removes every subscription of `handler`. Unknown handlers are ignored.
    pub fn unsubscribe(&self, handler: &Arc<dyn HookHandler>) -> &Self {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| !same_handler(&s.handler, handler));

        if subscribers.len() != before {
            debug!(
                hook = %self.name,
                removed = before - subscribers.len(),
                "Hook handler unsubscribed"
            );
        }

        self
    }

    /// Returns whether `handler` is currently subscribed.
    pub fn contains(&self, handler: &Arc<dyn HookHandler>) -> bool {
        self.subscribers
            .read()
            .iter()
            .any(|s| same_handler(&s.handler, handler))
    }

    /// Returns whether the hook has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Returns the number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Removes all subscribers. The hook stays registered under its name.
    pub fn reset(&self) {
        self.subscribers.write().clear();
    }

    /// Returns the subscriptions in the order the next dispatch will use.
    pub fn subscribers(&self) -> Vec<SubscriberInfo> {
        self.sorted_snapshot()
            .into_iter()
            .map(|s| SubscriberInfo {
                priority: s.priority,
                plugin: s.plugin,
            })
            .collect()
    }

    /// Sorts the stored subscribers by priority and returns a copy.
    pub(crate) fn sorted_snapshot(&self) -> Vec<Subscriber> {
        let mut subscribers = self.subscribers.write();
        subscribers.sort_by_key(|s| s.priority);
        subscribers.clone()
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("subscribers", &self.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}
