//! Hook system: named hook points, subscriber ordering, and dispatch.

pub mod definitions;
pub mod dispatcher;
pub mod hook;

pub use definitions::{
    ClosureHandler, DEFAULT_PRIORITY, Dispatch, HookAction, HookHandler, handler_fn,
};
pub use hook::{Hook, SubscriberInfo};
