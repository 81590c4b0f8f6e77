//! Convenience macros for hosts and plugin authors.

/// Builds a dispatch argument list from JSON-like literals.
///
/// # Example
/// ```rust,ignore
/// let args = hook_args![42, "file.txt", { "overwrite": true }];
/// manager.hook("before-save", args)?;
/// ```
#[macro_export]
macro_rules! hook_args {
    () => {
        ::std::vec::Vec::<$crate::__private::Value>::new()
    };
    ($($tt:tt)+) => {
        match $crate::__private::json!([$($tt)+]) {
            $crate::__private::Value::Array(items) => items,
            other => ::std::vec![other],
        }
    };
}

/// Exports a plugin module from a `cdylib` for the dynamic loader.
///
/// # Example
/// ```rust,ignore
/// hookline_plugin::export_plugin_module!(module_fn(|_| {
///     Ok(PluginDeclaration::named("audit"))
/// }));
/// ```
#[macro_export]
macro_rules! export_plugin_module {
    ($module:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn hookline_plugin_module() -> *mut ::std::ffi::c_void {
            let module: ::std::sync::Arc<dyn $crate::declaration::PluginModule> = $module;
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(module)) as *mut ::std::ffi::c_void
        }
    };
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    #[test]
    fn test_hook_args() {
        let empty = hook_args![];
        assert!(empty.is_empty());

        let args = hook_args![1, "two", { "three": 3 }, -4];
        assert_eq!(args, vec![json!(1), json!("two"), json!({"three": 3}), json!(-4)]);
    }
}
