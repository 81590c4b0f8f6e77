//! Module loaders: turn a file in a plugin directory into a plugin module.
//!
//! Loaders must return the same `Arc` for the same path so that importing a
//! file twice is recognized as the same module.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use hookline_core::error::AppError;
use hookline_core::result::AppResult;

use crate::declaration::PluginModule;

/// Loads plugin modules from files.
pub trait ModuleLoader: Send + Sync {
    /// File extensions (without the dot) this loader understands.
    fn extensions(&self) -> Vec<String>;

    /// Loads the module stored at `path`.
    fn load(&self, path: &Path) -> AppResult<Arc<dyn PluginModule>>;

    /// Returns whether `path` looks like a module this loader can load.
    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions().iter().any(|e| e == ext))
    }
}

/// Extension used by [`StaticLoader`] marker files.
pub const STATIC_MODULE_EXTENSION: &str = "plugin";

/// Loader for modules compiled into the host binary.
///
/// Modules are registered under a key; a file named `<key>.plugin` in a
/// plugin directory selects the module. The file's content is not read.
#[derive(Default)]
pub struct StaticLoader {
    /// Key → module.
    modules: RwLock<HashMap<String, Arc<dyn PluginModule>>>,
}

impl StaticLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `module` loadable from files named `<key>.plugin`.
    pub fn register(&self, key: impl Into<String>, module: Arc<dyn PluginModule>) -> &Self {
        self.modules.write().insert(key.into(), module);
        self
    }

    /// Returns the registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.modules.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl ModuleLoader for StaticLoader {
    fn extensions(&self) -> Vec<String> {
        vec![STATIC_MODULE_EXTENSION.to_string()]
    }

    fn load(&self, path: &Path) -> AppResult<Arc<dyn PluginModule>> {
        let key = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AppError::validation(format!("Invalid module path '{}'", path.display())))?;

        let module = self.modules.read().get(key).cloned().ok_or_else(|| {
            AppError::not_found(format!(
                "No compiled-in plugin module named '{}' (from '{}')",
                key,
                path.display()
            ))
        })?;

        debug!(module = %key, path = %path.display(), "Static plugin module loaded");
        Ok(module)
    }
}

impl std::fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticLoader")
            .field("modules", &self.keys())
            .finish()
    }
}

/// Dynamic plugin loader using `libloading` (feature-gated).
#[cfg(feature = "dynamic")]
pub mod dynamic_loader {
    use std::collections::HashMap;
    use std::ffi::c_void;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing::info;

    use hookline_core::error::AppError;
    use hookline_core::result::AppResult;

    use super::ModuleLoader;
    use crate::declaration::PluginModule;

    /// Name of the symbol dynamic plugins export.
    pub const ENTRY_SYMBOL: &[u8] = b"hookline_plugin_module";

    /// Type of the entry function exported by dynamic plugins.
    ///
    /// The returned pointer is a `Box<Arc<dyn PluginModule>>` turned into a
    /// raw pointer; see [`crate::export_plugin_module!`].
    pub type ModuleEntryFn = unsafe extern "C" fn() -> *mut c_void;

    #[derive(Default)]
    struct LoadedModules {
        /// Canonical path → module.
        modules: HashMap<PathBuf, Arc<dyn PluginModule>>,
        /// Loaded libraries (kept alive for the lifetime of the loader).
        libraries: Vec<libloading::Library>,
    }

    /// Loads plugin modules from shared libraries (.so / .dll / .dylib).
    ///
    /// Plugins must be built with the same compiler and `hookline-plugin`
    /// version as the host.
    #[derive(Default)]
    pub struct DynamicLoader {
        loaded: Mutex<LoadedModules>,
    }

    impl DynamicLoader {
        /// Creates a new dynamic loader.
        pub fn new() -> Self {
            Self::default()
        }

        /// Loads a module from the given shared library path.
        ///
        /// # Safety
        /// This function runs arbitrary code from a shared library.
        /// Only load trusted plugins.
        unsafe fn load_library(&self, path: &Path) -> AppResult<(libloading::Library, Arc<dyn PluginModule>)> {
            let lib = unsafe { libloading::Library::new(path) }.map_err(|e| {
                AppError::plugin(format!(
                    "Failed to load plugin library '{}': {}",
                    path.display(),
                    e
                ))
            })?;

            let module = {
                let entry: libloading::Symbol<ModuleEntryFn> =
                    unsafe { lib.get(ENTRY_SYMBOL) }.map_err(|e| {
                        AppError::plugin(format!(
                            "Plugin '{}' missing 'hookline_plugin_module' symbol: {}",
                            path.display(),
                            e
                        ))
                    })?;

                let raw = unsafe { entry() };
                if raw.is_null() {
                    return Err(AppError::plugin(format!(
                        "Plugin '{}' returned no module",
                        path.display()
                    )));
                }
                let boxed = unsafe { Box::from_raw(raw as *mut Arc<dyn PluginModule>) };
                *boxed
            };

            Ok((lib, module))
        }
    }

    impl ModuleLoader for DynamicLoader {
        fn extensions(&self) -> Vec<String> {
            vec![std::env::consts::DLL_EXTENSION.to_string()]
        }

        fn load(&self, path: &Path) -> AppResult<Arc<dyn PluginModule>> {
            let canonical = path.canonicalize()?;
            let mut loaded = self.loaded.lock();

            if let Some(module) = loaded.modules.get(&canonical) {
                return Ok(module.clone());
            }

            // SAFETY: plugin directories are operator-controlled.
            let (lib, module) = unsafe { self.load_library(&canonical)? };

            info!(path = %canonical.display(), "Dynamic plugin loaded");

            loaded.libraries.push(lib);
            loaded.modules.insert(canonical, module.clone());
            Ok(module)
        }
    }

    impl std::fmt::Debug for DynamicLoader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("DynamicLoader")
                .field("loaded_count", &self.loaded.lock().libraries.len())
                .finish()
        }
    }
}

#[cfg(feature = "dynamic")]
pub use dynamic_loader::DynamicLoader;
