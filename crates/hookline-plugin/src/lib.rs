//! # hookline-plugin
//!
//! Plugin engine for hookline. Provides:
//!
//! - Named hooks with priority-ordered subscribers
//! - Series, parallel, and waterfall dispatch with Continue/Halt semantics
//! - Plugin declarations, lifecycle (init, require, stop, settings), and
//!   public surfaces
//! - A per-manager registry with module path resolution
//! - Static module loading, and dynamic loading via `libloading`
//!   (feature `dynamic`)

pub mod declaration;
pub mod error;
pub mod hooks;
pub mod loader;
#[macro_use]
mod macros;
pub mod manager;
pub mod plugin;
pub mod prelude;
pub mod registry;

#[doc(hidden)]
pub mod __private {
    pub use serde_json::{Value, json};
}

pub use declaration::{PluginDeclaration, PluginModule};
pub use error::{HookError, PluginError};
pub use hooks::{Dispatch, Hook, HookAction, HookHandler};
pub use loader::{ModuleLoader, StaticLoader};
pub use manager::{LifecycleReport, PluginManager, PluginSource};
pub use plugin::{Plugin, PluginRecord};
pub use registry::Registry;

#[cfg(feature = "dynamic")]
pub use loader::DynamicLoader;
