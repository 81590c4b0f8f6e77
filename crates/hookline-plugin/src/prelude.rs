//! Prelude for convenient imports.

pub use async_trait::async_trait;

pub use hookline_core::error::AppError;
pub use hookline_core::result::AppResult;

pub use crate::declaration::{
    HookBinding, LifecycleHandler, PluginDeclaration, PluginModule, lifecycle_fn, module_fn,
};
pub use crate::error::{HookError, PluginError};
pub use crate::hooks::{DEFAULT_PRIORITY, Dispatch, Hook, HookAction, HookHandler, handler_fn};
pub use crate::loader::{ModuleLoader, StaticLoader};
pub use crate::manager::{LifecycleReport, PluginManager};
pub use crate::plugin::Plugin;

pub use crate::{export_plugin_module, hook_args};
