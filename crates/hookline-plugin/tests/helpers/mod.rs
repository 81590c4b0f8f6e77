//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use hookline_plugin::declaration::{PluginDeclaration, PluginModule, lifecycle_fn, module_fn};
use hookline_plugin::hooks::{HookAction, handler_fn};
use hookline_plugin::{PluginManager, StaticLoader};

/// Records calls in the order they happen.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Module that shapes its declaration from the import context.
///
/// Recognized context keys: `name`, `priority`, `public`, and `hooks` (a list
/// of hook names, each answered with `"<plugin>:<hook>"`). Every lifecycle
/// method is logged as `"<method>:<plugin>"`.
pub fn context_module(log: &CallLog) -> Arc<dyn PluginModule> {
    let log = log.clone();
    module_fn(move |context| {
        let mut decl = PluginDeclaration::new();
        if let Some(name) = context.get("name").and_then(Value::as_str) {
            decl = decl.with_name(name);
        }
        if let Some(priority) = context.get("priority").and_then(Value::as_i64) {
            decl = decl.with_priority(priority as i32);
        }
        if let Some(public) = context.get("public").and_then(Value::as_object) {
            for (key, value) in public {
                decl = decl.public(key.clone(), value.clone());
            }
        }

        let label = decl.name.clone().unwrap_or_else(|| "anonymous".to_string());
        for method in ["init", "require", "stop", "settings"] {
            let log = log.clone();
            let entry = format!("{method}:{label}");
            let handler = lifecycle_fn(move |_| {
                let log = log.clone();
                let entry = entry.clone();
                async move {
                    log.push(entry);
                    Ok(Value::Null)
                }
            });
            decl = match method {
                "init" => decl.on_init(handler),
                "require" => decl.on_require(handler),
                "stop" => decl.on_stop(handler),
                _ => decl.on_settings(handler),
            };
        }

        if let Some(hooks) = context.get("hooks").and_then(Value::as_array) {
            for hook in hooks.iter().filter_map(Value::as_str) {
                let reply = Value::from(format!("{label}:{hook}"));
                decl = decl.hook(
                    hook,
                    handler_fn(move |_| {
                        let reply = reply.clone();
                        async move { Ok(HookAction::continue_with(reply)) }
                    }),
                );
            }
        }

        Ok(decl)
    })
}

/// Manager backed by a static loader, searching `dir`.
pub fn manager_in(dir: &Path, loader: StaticLoader) -> PluginManager {
    PluginManager::new(Arc::new(loader)).with_directories(vec![dir.to_path_buf()])
}

/// Creates an empty `<key>.plugin` marker file.
pub fn write_marker(dir: &Path, key: &str) {
    std::fs::write(dir.join(format!("{key}.plugin")), "").expect("write marker");
}
