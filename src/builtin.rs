//! Plugins bundled with the host binary.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::info;

use hookline_plugin::declaration::{PluginDeclaration, PluginModule, lifecycle_fn, module_fn};
use hookline_plugin::hooks::{HookAction, handler_fn};
use hookline_plugin::StaticLoader;

/// Key of the sample plugin in the static loader.
pub const AWESOME_PLUGIN: &str = "awesome-plugin";

/// Makes the bundled modules loadable from `<key>.plugin` files.
pub fn register(loader: &StaticLoader) {
    loader.register(AWESOME_PLUGIN, awesome_plugin());
}

/// Sample plugin subscribed to `before-load` and `after-load`.
pub fn awesome_plugin() -> Arc<dyn PluginModule> {
    static MODULE: std::sync::OnceLock<Arc<dyn PluginModule>> = std::sync::OnceLock::new();

    MODULE
        .get_or_init(|| {
            module_fn(|_context| {
                info!("there will be awesome later");
                Ok(PluginDeclaration::named(AWESOME_PLUGIN)
                    .on_init(lifecycle_fn(|_| async {
                        info!("hope you're ready for awesome");
                        Ok(Value::Null)
                    }))
                    .hook(
                        "before-load",
                        handler_fn(|args| async move {
                            info!(args = args.len(), "awesome");
                            Ok(HookAction::continue_with(json!("awesome")))
                        }),
                    )
                    .hook(
                        "after-load",
                        handler_fn(|_| async { Ok(HookAction::continue_with(json!("still awesome"))) }),
                    )
                    .on_stop(lifecycle_fn(|_| async {
                        info!("the awesome is over. go home.");
                        Ok(Value::Null)
                    }))
                    .public("tagline", "awesome"))
            })
        })
        .clone()
}
