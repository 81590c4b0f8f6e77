//! Hook dispatch disciplines.
//!
//! - **Series**: subscribers run one after another in priority order with
//!   the same arguments. A veto stops the chain; the result is `true`.
//! - **Parallel**: every subscriber is started at once on the calling task.
//!   Results come back in priority order, not completion order. The first
//!   failure to complete fails the whole dispatch at once.
//! - **Waterfall**: like series, but each subscriber after the first gets
//!   the previous result prepended to the arguments. The result is the last
//!   subscriber's value.
//!
//! Every discipline re-sorts the subscribers before it starts, and answers
//! [`Dispatch::NotApplicable`] without scheduling anything when the hook has
//! no subscribers.

use std::sync::Arc;

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use serde_json::Value;
use tracing::debug;

use super::definitions::Dispatch;
use super::hook::Hook;
use crate::error::HookError;

impl Hook {
    /// Runs the subscribers one at a time in priority order.
    pub fn series(&self, args: Vec<Value>) -> Dispatch<bool> {
        let subscribers = self.sorted_snapshot();
        if subscribers.is_empty() {
            return Dispatch::NotApplicable;
        }

        let hook = self.name().to_string();
        let timeout = self.timeout;
        debug!(hook = %hook, handler_count = subscribers.len(), "Dispatching hook in series");

        Dispatch::Pending(Box::pin(async move {
            for subscriber in &subscribers {
                subscriber.invoke(&hook, &args, timeout).await?;
            }
            Ok(true)
        }))
    }

    /// Runs all subscribers concurrently and collects their results in
    /// priority order.
    ///
    /// The first failure to complete ends the dispatch right away. The
    /// subscribers still running are detached onto a tokio task, so each one
    /// is invoked exactly once; their outcomes are dropped.
    pub fn parallel(&self, args: Vec<Value>) -> Dispatch<Vec<Value>> {
        let subscribers = self.sorted_snapshot();
        if subscribers.is_empty() {
            return Dispatch::NotApplicable;
        }

        let hook: Arc<str> = Arc::from(self.name());
        let args = Arc::new(args);
        let timeout = self.timeout;
        debug!(hook = %hook, handler_count = subscribers.len(), "Dispatching hook in parallel");

        Dispatch::Pending(Box::pin(async move {
            let mut results: Vec<Option<Value>> = vec![None; subscribers.len()];

            let mut running: FuturesUnordered<BoxFuture<'static, (usize, Result<Value, HookError>)>> =
                subscribers
                    .into_iter()
                    .enumerate()
                    .map(|(index, subscriber)| {
                        let hook = hook.clone();
                        let args = args.clone();
                        let call: BoxFuture<'static, _> = Box::pin(async move {
                            (index, subscriber.invoke(&hook, &args, timeout).await)
                        });
                        call
                    })
                    .collect();

            while let Some((index, outcome)) = running.next().await {
                match outcome {
                    Ok(value) => results[index] = Some(value),
                    Err(err) => {
                        if !running.is_empty() {
                            debug!(
                                hook = %hook,
                                remaining = running.len(),
                                "Parallel dispatch failed, detaching remaining subscribers"
                            );
                            tokio::spawn(async move { while running.next().await.is_some() {} });
                        }
                        return Err(err);
                    }
                }
            }

            Ok(results.into_iter().flatten().collect())
        }))
    }

    /// Runs the subscribers in priority order, feeding each result into the
    /// next subscriber as its first argument.
    pub fn waterfall(&self, args: Vec<Value>) -> Dispatch<Value> {
        let subscribers = self.sorted_snapshot();
        if subscribers.is_empty() {
            return Dispatch::NotApplicable;
        }

        let hook = self.name().to_string();
        let timeout = self.timeout;
        debug!(hook = %hook, handler_count = subscribers.len(), "Dispatching hook in waterfall");

        Dispatch::Pending(Box::pin(async move {
            let mut previous: Option<Value> = None;

            for subscriber in &subscribers {
                let call_args = match previous.take() {
                    None => args.clone(),
                    Some(prev) => {
                        let mut chained = Vec::with_capacity(args.len() + 1);
                        chained.push(prev);
                        chained.extend(args.iter().cloned());
                        chained
                    }
                };
                previous = Some(subscriber.invoke(&hook, &call_args, timeout).await?);
            }

            Ok(previous.unwrap_or(Value::Null))
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::error::HookError;
    use crate::hooks::definitions::{DEFAULT_PRIORITY, HookAction, HookHandler, handler_fn};
    use crate::hooks::hook::Hook;

    fn recorder(log: &Arc<Mutex<Vec<i64>>>, id: i64) -> Arc<dyn HookHandler> {
        let log = log.clone();
        handler_fn(move |_| {
            let log = log.clone();
            async move {
                log.lock().push(id);
                Ok(HookAction::continue_with(id))
            }
        })
    }

    fn veto() -> Arc<dyn HookHandler> {
        handler_fn(|_| async { Ok(HookAction::Halt) })
    }

    fn increment() -> Arc<dyn HookHandler> {
        handler_fn(|args| async move {
            let value = args.first().and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(HookAction::continue_with(value + 1))
        })
    }

    #[test]
    fn test_empty_hook_is_not_applicable() {
        let hook = Hook::new("empty").unwrap();
        assert!(hook.series(vec![]).is_not_applicable());
        assert!(hook.parallel(vec![]).is_not_applicable());
        assert!(hook.waterfall(vec![]).is_not_applicable());
    }

    #[tokio::test]
    async fn test_series_forwards_args_and_returns_true() {
        let hook = Hook::new("load").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        hook.subscribe(
            handler_fn(move |args| {
                let captured = captured.clone();
                async move {
                    captured.lock().push(args);
                    Ok(HookAction::continue_with("ignored"))
                }
            }),
            DEFAULT_PRIORITY,
            None,
        )
        .unwrap();

        let result = hook.series(vec![json!(1), json!({"k": "v"})]).await.unwrap();
        assert_eq!(result, Some(true));
        assert_eq!(seen.lock()[0], vec![json!(1), json!({"k": "v"})]);
    }

    #[tokio::test]
    async fn test_series_runs_in_priority_order() {
        let hook = Hook::new("load").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        hook.subscribe(recorder(&log, 2), 100, None).unwrap();
        hook.subscribe(recorder(&log, 1), 99, None).unwrap();
        hook.subscribe(recorder(&log, 3), 100, None).unwrap();

        hook.series(vec![]).await.unwrap();
        assert_eq!(*log.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_series_veto_stops_chain() {
        let hook = Hook::new("load").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        hook.subscribe(veto(), 100, Some("first")).unwrap();
        hook.subscribe(recorder(&log, 2), 100, Some("second")).unwrap();

        let err = hook.series(vec![]).await.unwrap_err();
        assert!(err.is_veto());
        assert_eq!(err.plugin(), Some("first"));
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_series_veto_after_side_effects() {
        // fnC subscribed last but with the lowest priority still runs first.
        let hook = Hook::new("load").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        hook.subscribe(recorder(&log, 50), 50, Some("a")).unwrap();
        hook.subscribe(veto(), 100, Some("b")).unwrap();
        hook.subscribe(recorder(&log, 10), 10, Some("c")).unwrap();

        let err = hook.series(vec![json!("x")]).await.unwrap_err();
        assert_eq!(err.plugin(), Some("b"));
        assert_eq!(*log.lock(), vec![10, 50]);
    }

    #[tokio::test]
    async fn test_parallel_results_in_priority_order() {
        let hook = Hook::new("load").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        hook.subscribe(recorder(&log, 3), 30, None).unwrap();
        hook.subscribe(recorder(&log, 1), 10, None).unwrap();
        hook.subscribe(recorder(&log, 2), 20, None).unwrap();

        let results = hook.parallel(vec![]).await.unwrap().unwrap();
        assert_eq!(results, vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn test_parallel_ignores_completion_order() {
        let hook = Hook::new("load").unwrap();
        hook.subscribe(
            handler_fn(|_| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(HookAction::continue_with("slow"))
            }),
            1,
            None,
        )
        .unwrap();
        hook.subscribe(
            handler_fn(|_| async { Ok(HookAction::continue_with("fast")) }),
            2,
            None,
        )
        .unwrap();

        let results = hook.parallel(vec![]).await.unwrap().unwrap();
        assert_eq!(results, vec![json!("slow"), json!("fast")]);
    }

    #[tokio::test]
    async fn test_parallel_veto_still_invokes_everyone() {
        let hook = Hook::new("load").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = calls.clone();
            hook.subscribe(
                handler_fn(move |_| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(HookAction::continue_execution())
                    }
                }),
                200,
                Some("counter"),
            )
            .unwrap();
        }
        hook.subscribe(veto(), 100, Some("guard")).unwrap();

        let err = hook.parallel(vec![]).await.unwrap_err();
        assert_eq!(err.plugin(), Some("guard"));

        for _ in 0..10 {
            if calls.load(Ordering::SeqCst) == 3 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_veto_does_not_wait_for_slow_subscriber() {
        let hook = Hook::new("load").unwrap();
        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();
        hook.subscribe(veto(), 10, Some("guard")).unwrap();
        hook.subscribe(
            handler_fn(move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(HookAction::continue_execution())
                }
            }),
            20,
            Some("sleepy"),
        )
        .unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(5), hook.parallel(vec![])).await;
        let err = outcome.expect("veto must not wait for the slow subscriber").unwrap_err();
        assert!(err.is_veto());
        assert_eq!(err.plugin(), Some("guard"));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_parallel_forwards_args() {
        let hook = Hook::new("load").unwrap();
        hook.subscribe(increment(), DEFAULT_PRIORITY, None).unwrap();
        hook.subscribe(increment(), DEFAULT_PRIORITY, None).unwrap();

        let results = hook.parallel(vec![json!(1)]).await.unwrap().unwrap();
        assert_eq!(results, vec![json!(2), json!(2)]);
    }

    #[tokio::test]
    async fn test_waterfall_chains_results() {
        let hook = Hook::new("load").unwrap();
        hook.subscribe(increment(), DEFAULT_PRIORITY, None).unwrap();
        assert_eq!(hook.waterfall(vec![]).await.unwrap(), Some(json!(1)));

        hook.subscribe(increment(), DEFAULT_PRIORITY, None).unwrap();
        hook.subscribe(increment(), DEFAULT_PRIORITY, None).unwrap();
        assert_eq!(hook.waterfall(vec![json!(10)]).await.unwrap(), Some(json!(13)));
    }

    #[tokio::test]
    async fn test_waterfall_prepends_previous_result() {
        let hook = Hook::new("load").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        hook.subscribe(
            handler_fn(|_| async { Ok(HookAction::continue_with("first")) }),
            1,
            None,
        )
        .unwrap();
        let captured = seen.clone();
        hook.subscribe(
            handler_fn(move |args| {
                let captured = captured.clone();
                async move {
                    captured.lock().push(args);
                    Ok(HookAction::continue_with("second"))
                }
            }),
            2,
            None,
        )
        .unwrap();

        let result = hook.waterfall(vec![json!("a"), json!("b")]).await.unwrap();
        assert_eq!(result, Some(json!("second")));
        assert_eq!(seen.lock()[0], vec![json!("first"), json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn test_waterfall_veto_stops_chain() {
        let hook = Hook::new("load").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        hook.subscribe(veto(), 100, Some("first")).unwrap();
        hook.subscribe(recorder(&log, 2), 100, Some("second")).unwrap();

        let err = hook.waterfall(vec![]).await.unwrap_err();
        assert_eq!(err.plugin(), Some("first"));
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribed_handler_never_runs() {
        let hook = Hook::new("load").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let gone = recorder(&log, 1);
        hook.subscribe(gone.clone(), 10, None).unwrap();
        hook.subscribe(recorder(&log, 2), 20, None).unwrap();
        hook.unsubscribe(&gone);

        hook.series(vec![]).await.unwrap();
        assert_eq!(*log.lock(), vec![2]);
    }

    #[tokio::test]
    async fn test_subscriber_error_is_reported() {
        let hook = Hook::new("load").unwrap();
        hook.subscribe(
            handler_fn(|_| async { Err(hookline_core::AppError::internal("boom")) }),
            DEFAULT_PRIORITY,
            Some("broken"),
        )
        .unwrap();

        let err = hook.series(vec![]).await.unwrap_err();
        assert!(matches!(err, HookError::Failed { .. }));
        assert!(!err.is_veto());
        assert_eq!(err.plugin(), Some("broken"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_subscriber_times_out() {
        let hook = Hook::new("load")
            .unwrap()
            .with_timeout(Some(Duration::from_secs(1)));
        hook.subscribe(
            handler_fn(|_| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(HookAction::continue_execution())
            }),
            DEFAULT_PRIORITY,
            Some("sleepy"),
        )
        .unwrap();

        let err = hook.waterfall(vec![]).await.unwrap_err();
        assert!(matches!(err, HookError::TimedOut { .. }));
        assert_eq!(err.plugin(), Some("sleepy"));
    }
}
