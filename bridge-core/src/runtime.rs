//! Blocking entry point from foreign threads into the async client.
//!
//! The foreign boundary is synchronous: a caller's thread parks until the
//! operation finishes or its scope is canceled. `BlockingRuntime` owns the
//! tokio runtime that drives client futures and is the only place the bridge
//! crosses from blocking into async.

use std::future::Future;

use client_traits::{ClientError, Result as ClientResult};

use crate::scope::Scope;

/// Owns the runtime all boundary operations execute on.
///
/// Constructed once per bridge instance; `run` may be called concurrently
/// from any number of foreign threads.
pub struct BlockingRuntime {
    runtime: tokio::runtime::Runtime,
}

impl BlockingRuntime {
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("depot-bridge")
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    /// Drive `future` to completion on the calling thread, racing it against
    /// the scope's cancellation signal.
    ///
    /// Returns `None` if the scope was canceled first (or already was); the
    /// future is dropped at its current suspension point in that case.
    pub fn run_until_cancelled<F: Future>(&self, scope: &Scope, future: F) -> Option<F::Output> {
        if scope.is_canceled() {
            return None;
        }
        self.runtime
            .block_on(scope.token().run_until_cancelled(future))
    }

    /// Like `run_until_cancelled` for client calls: cancellation surfaces as
    /// `ClientError::Canceled` so call sites stay on the `?` path.
    pub fn run<T>(
        &self,
        scope: &Scope,
        future: impl Future<Output = ClientResult<T>>,
    ) -> ClientResult<T> {
        match self.run_until_cancelled(scope, future) {
            Some(result) => result,
            None => Err(ClientError::Canceled),
        }
    }
}
