//! Integration tests for hook dispatch across several plugins.

use std::sync::Arc;

use serde_json::json;

use hookline_plugin::declaration::{PluginDeclaration, module_fn};
use hookline_plugin::hooks::{HookAction, handler_fn};
use hookline_plugin::{HookError, PluginManager, StaticLoader};

fn manager() -> PluginManager {
    PluginManager::new(Arc::new(StaticLoader::new()))
}

#[tokio::test]
async fn test_per_hook_priority_beats_plugin_priority() {
    let manager = manager();

    manager
        .plugin(
            module_fn(|_| {
                Ok(PluginDeclaration::named("early-plugin")
                    .with_priority(1)
                    .hook_with_priority(
                        "render",
                        handler_fn(|_| async { Ok(HookAction::continue_with("late-handler")) }),
                        500,
                    ))
            }),
            None,
        )
        .unwrap();
    manager
        .plugin(
            module_fn(|_| {
                Ok(PluginDeclaration::named("late-plugin")
                    .with_priority(300)
                    .hook("render", handler_fn(|_| async { Ok(HookAction::continue_with("early-handler")) })))
            }),
            None,
        )
        .unwrap();

    assert!(manager.init_all(&[]).await.is_success());

    let results = manager.hook("render", vec![]).unwrap().await.unwrap();
    assert_eq!(results, Some(vec![json!("early-handler"), json!("late-handler")]));

    let subscribers = manager.manage_hook("render").unwrap().subscribers();
    assert_eq!(subscribers[0].plugin.as_deref(), Some("late-plugin"));
    assert_eq!(subscribers[0].priority, 300);
}

#[tokio::test]
async fn test_veto_names_the_plugin() {
    let manager = manager();

    manager
        .plugin(
            module_fn(|_| {
                Ok(PluginDeclaration::named("guard")
                    .with_priority(10)
                    .hook("save", handler_fn(|_| async { Ok(HookAction::Halt) })))
            }),
            None,
        )
        .unwrap();
    manager
        .plugin(
            module_fn(|_| {
                Ok(PluginDeclaration::named("writer")
                    .hook("save", handler_fn(|_| async { Ok(HookAction::continue_with(true)) })))
            }),
            None,
        )
        .unwrap();
    manager.init_all(&[]).await;

    let err = manager.series("save", vec![]).unwrap().await.unwrap_err();
    assert!(err.is_veto());
    assert_eq!(err.plugin(), Some("guard"));
    assert_eq!(err.hook(), "save");

    // Stopping the guard lets the chain through.
    let mut guard = manager.plugin("guard", None).unwrap();
    guard.stop(&[]).await.unwrap();
    assert_eq!(manager.series("save", vec![]).unwrap().await.unwrap(), Some(true));
}

#[tokio::test]
async fn test_waterfall_through_plugins() {
    let manager = manager();

    for (name, priority, add) in [("double", 20, 0), ("plus-one", 10, 1)] {
        manager
            .plugin(
                module_fn(move |_| {
                    Ok(PluginDeclaration::named(name).with_priority(priority).hook(
                        "score",
                        handler_fn(move |args| async move {
                            let current = args[0].as_i64().unwrap_or_default();
                            let next = if add == 0 { current * 2 } else { current + add };
                            Ok(HookAction::continue_with(next))
                        }),
                    ))
                }),
                None,
            )
            .unwrap();
    }
    manager.init_all(&[]).await;

    // (4 + 1) * 2
    let result = manager.waterfall("score", vec![json!(4)]).unwrap().await.unwrap();
    assert_eq!(result, Some(json!(10)));
}

#[tokio::test]
async fn test_failing_subscriber_surfaces_plugin() {
    let manager = manager();
    manager
        .plugin(
            module_fn(|_| {
                Ok(PluginDeclaration::named("flaky").hook(
                    "load",
                    handler_fn(|_| async {
                        Err(hookline_core::AppError::internal("disk on fire"))
                    }),
                ))
            }),
            None,
        )
        .unwrap();
    manager.init_all(&[]).await;

    let err = manager.hook("load", vec![]).unwrap().await.unwrap_err();
    assert!(matches!(err, HookError::Failed { ref plugin, .. } if plugin.as_deref() == Some("flaky")));
}
