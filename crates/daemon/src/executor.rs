// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequential executor: every method invocation against the singleton
//! object runs on one dedicated task, strictly in arrival order. No two
//! calls ever overlap, so embedding applications never need to make their
//! `Dispatch` implementation thread-safe beyond `Send`.

use serde_json::Value;
use singleton_core::{Dispatch, DispatchError, ObjectFactory};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

struct ExecutionRequest {
    method_name: String,
    args: Value,
    kwargs: Value,
    reply: oneshot::Sender<Result<Value, DispatchError>>,
}

/// Handle held by each connection task to submit work to the executor.
#[derive(Clone)]
pub struct ExecutorHandle {
    tx: mpsc::Sender<ExecutionRequest>,
}

impl ExecutorHandle {
    /// Enqueue a call and await its result. Resolves in FIFO order with
    /// every other call submitted through any handle.
    pub async fn call(
        &self,
        method_name: impl Into<String>,
        args: Value,
        kwargs: Value,
    ) -> Result<Value, DispatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = ExecutionRequest {
            method_name: method_name.into(),
            args,
            kwargs,
            reply: reply_tx,
        };
        if self.tx.send(request).await.is_err() {
            return Err(DispatchError::new(
                "ServerShuttingDown",
                "executor is no longer accepting work",
            ));
        }
        reply_rx.await.unwrap_or_else(|_| {
            Err(DispatchError::new(
                "ServerCrashed",
                "executor dropped the reply channel before answering",
            ))
        })
    }
}

/// The running executor: owns the singleton instance and the task that
/// drains its queue. Dropping this (after closing the sender side via
/// [`SequentialExecutor::shutdown`]) lets in-flight calls drain before the
/// task exits.
pub struct SequentialExecutor {
    handle: ExecutorHandle,
    task: tokio::task::JoinHandle<()>,
}

impl SequentialExecutor {
    /// Build the singleton via `factory` and spawn the worker task that
    /// will own it for the rest of the daemon's life.
    pub fn spawn(factory: &dyn ObjectFactory) -> Result<Self, DispatchError> {
        let mut object = factory.create()?;
        let (tx, mut rx) = mpsc::channel::<ExecutionRequest>(256);

        let task = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                debug!(method = %request.method_name, "dispatching call");
                let result = object.call(&request.method_name, request.args, request.kwargs);
                if request.reply.send(result).is_err() {
                    warn!("caller went away before the result could be delivered");
                }
            }
        });

        Ok(Self {
            handle: ExecutorHandle { tx },
            task,
        })
    }

    pub fn handle(&self) -> ExecutorHandle {
        self.handle.clone()
    }

    /// Stop accepting new work and wait for the queue to drain. Calls
    /// already enqueued before this is invoked still run to completion;
    /// calls submitted concurrently with or after this race to either join
    /// the drain or see their send fail.
    pub async fn shutdown(self) {
        drop(self.handle.tx);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use singleton_core::FnFactory;

    struct Counter(i64);

    impl Dispatch for Counter {
        fn call(&mut self, method: &str, _args: Value, _kwargs: Value) -> Result<Value, DispatchError> {
            match method {
                "inc" => {
                    self.0 += 1;
                    Ok(json!(self.0))
                }
                "boom" => Err(DispatchError::new("RuntimeError", "nope")),
                other => Err(DispatchError::unknown_method(other)),
            }
        }
    }

    fn counter_factory() -> FnFactory<impl Fn() -> Result<Box<dyn Dispatch>, DispatchError>> {
        FnFactory(|| Ok(Box::new(Counter(0)) as Box<dyn Dispatch>))
    }

    #[tokio::test]
    async fn calls_are_applied_in_submission_order() {
        let factory = counter_factory();
        let executor = SequentialExecutor::spawn(&factory).unwrap();
        let handle = executor.handle();

        for expected in 1..=5 {
            let result = handle.call("inc", Value::Null, Value::Null).await.unwrap();
            assert_eq!(result, json!(expected));
        }
        executor.shutdown().await;
    }

    #[tokio::test]
    async fn concurrent_callers_still_serialize() {
        let factory = counter_factory();
        let executor = SequentialExecutor::spawn(&factory).unwrap();
        let handle = executor.handle();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.call("inc", Value::Null, Value::Null).await
            }));
        }
        let mut results: Vec<i64> = Vec::new();
        for t in tasks {
            results.push(t.await.unwrap().unwrap().as_i64().unwrap());
        }
        results.sort();
        assert_eq!(results, (1..=8).collect::<Vec<_>>());
        executor.shutdown().await;
    }

    #[tokio::test]
    async fn method_errors_surface_to_the_caller() {
        let factory = counter_factory();
        let executor = SequentialExecutor::spawn(&factory).unwrap();
        let handle = executor.handle();

        let err = handle.call("boom", Value::Null, Value::Null).await.unwrap_err();
        assert_eq!(err.kind_tag, "RuntimeError");
        executor.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_lets_queued_work_drain_then_stops() {
        let factory = counter_factory();
        let executor = SequentialExecutor::spawn(&factory).unwrap();
        let handle = executor.handle();

        let in_flight = handle.call("inc", Value::Null, Value::Null).await;
        assert!(in_flight.is_ok());

        executor.shutdown().await;
        let err = handle.call("inc", Value::Null, Value::Null).await.unwrap_err();
        assert_eq!(err.kind_tag, "ServerShuttingDown");
    }
}
