//! Hook handler contract, handler results, and the dispatch outcome type.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hookline_core::result::AppResult;

use crate::error::HookError;

/// Priority assigned to subscribers and plugins that do not choose one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Action returned by a hook handler telling the dispatcher what to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HookAction {
    /// Keep going; the value is this subscriber's result.
    Continue(Value),
    /// Veto the dispatch. No further subscribers run in series or waterfall
    /// mode, and the dispatch fails with the subscriber's owning plugin.
    Halt,
}

impl HookAction {
    /// Continue without a meaningful result.
    pub fn continue_execution() -> Self {
        Self::Continue(Value::Null)
    }

    /// Continue with a result value.
    pub fn continue_with(value: impl Into<Value>) -> Self {
        Self::Continue(value.into())
    }

    /// Returns whether this action vetoes the dispatch.
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halt)
    }
}

/// Trait for hook handler implementations.
///
/// Handlers receive the arguments passed to the dispatch call. In waterfall
/// mode every handler after the first gets the previous result prepended.
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// Handles a hook invocation.
    async fn handle(&self, args: &[Value]) -> AppResult<HookAction>;
}

type HandlerFn = dyn Fn(Vec<Value>) -> BoxFuture<'static, AppResult<HookAction>> + Send + Sync;

/// A closure-based hook handler for quick handler creation.
pub struct ClosureHandler {
    /// Handler function.
    handler: Box<HandlerFn>,
}

impl fmt::Debug for ClosureHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureHandler")
            .field("handler", &"<closure>")
            .finish()
    }
}

impl ClosureHandler {
    /// Creates a new closure-based handler.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<HookAction>> + Send + 'static,
    {
        Self {
            handler: Box::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl HookHandler for ClosureHandler {
    async fn handle(&self, args: &[Value]) -> AppResult<HookAction> {
        (self.handler)(args.to_vec()).await
    }
}

/// Wraps an async closure into a shareable hook handler.
///
/// The returned `Arc` is the subscriber's identity: keep a clone of it to
/// unsubscribe later.
pub fn handler_fn<F, Fut>(handler: F) -> Arc<dyn HookHandler>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<HookAction>> + Send + 'static,
{
    Arc::new(ClosureHandler::new(handler))
}

/// Returns whether two handler handles point at the same handler.
pub(crate) fn same_handler(a: &Arc<dyn HookHandler>, b: &Arc<dyn HookHandler>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Outcome of starting a dispatch.
///
/// A hook without subscribers answers [`Dispatch::NotApplicable`] right
/// away; otherwise the dispatch is [`Dispatch::Pending`] and must be awaited.
/// Awaiting a `Dispatch` directly yields `Ok(None)` for the not-applicable
/// case.
pub enum Dispatch<T> {
    /// The hook had no subscribers; nothing was scheduled.
    NotApplicable,
    /// The running dispatch.
    Pending(BoxFuture<'static, Result<T, HookError>>),
}

impl<T> Dispatch<T> {
    /// Returns whether the hook had no subscribers.
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable)
    }
}

impl<T> fmt::Debug for Dispatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApplicable => f.write_str("Dispatch::NotApplicable"),
            Self::Pending(_) => f.write_str("Dispatch::Pending(..)"),
        }
    }
}

impl<T: Send + 'static> IntoFuture for Dispatch<T> {
    type Output = Result<Option<T>, HookError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::NotApplicable => Box::pin(futures::future::ready(Ok(None))),
            Self::Pending(fut) => Box::pin(async move { fut.await.map(Some) }),
        }
    }
}
