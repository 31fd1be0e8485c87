mod join_handle;

use std::{future::Future, time::Duration};

pub(crate) use self::join_handle::AsyncJoinHandle;
use crate::error::{ErrorKind, Result};

/// Spawn a task in the background to run a future.
///
/// This must be called from an async block or function running on a runtime.
pub(crate) fn spawn<F, O>(fut: F) -> AsyncJoinHandle<O>
where
    F: Future<Output = O> + Send + 'static,
    O: Send + 'static,
{
    AsyncJoinHandle::spawn(fut)
}

/// Spawn a task in the background to run a future, without waiting for it.
///
/// Outside of a runtime (e.g. while one is shutting down) the future is dropped instead.
pub(crate) fn execute<F, O>(fut: F)
where
    F: Future<Output = O> + Send + 'static,
    O: Send + 'static,
{
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(fut);
    }
}

/// Await on a future for a maximum amount of time before returning an error.
pub(crate) async fn timeout<F: Future>(
    timeout: Duration,
    future: F,
    what: impl FnOnce() -> ErrorKind,
) -> Result<F::Output> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| what().into())
}
