//! # hookline-core
//!
//! Core crate for hookline. Contains the configuration schemas and the
//! unified error system shared by the plugin engine and the host binary.
//!
//! This crate has **no** internal dependencies on other hookline crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
