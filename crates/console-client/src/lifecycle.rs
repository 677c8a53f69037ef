use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{AbortHandle, Abortable, Aborted};
use manus_console_core::{ApiRequest, RequestFailure, RequestOutcome};
use serde_json::Value;

use crate::transport::Transport;

/// Cancels one request started through [`execute`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    abort: AbortHandle,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.abort.abort();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.abort.is_aborted()
    }
}

/// Wraps a single transport call with its deadline and a cancel handle.
///
/// The returned future resolves to `Timeout` when `request.timeout_ms`
/// elapses first, to `Cancelled` when the handle fires first, and to the
/// transport's own classification otherwise. Dropping the future drops the
/// in-flight call. There are no retries.
pub fn execute<T>(
    transport: Arc<T>,
    request: ApiRequest,
) -> (
    CancelHandle,
    impl Future<Output = RequestOutcome<Value>> + Send + 'static,
)
where
    T: Transport + ?Sized,
{
    let (abort, registration) = AbortHandle::new_pair();
    let deadline = Duration::from_millis(request.timeout_ms);
    let future = async move {
        let call = Abortable::new(transport.send(&request), registration);
        let outcome = match tokio::time::timeout(deadline, call).await {
            Err(_elapsed) => Err(RequestFailure::Timeout),
            Ok(Err(Aborted)) => Err(RequestFailure::Cancelled),
            Ok(Ok(outcome)) => outcome,
        };
        if let Err(failure) = &outcome {
            tracing::debug!(
                method = request.method.as_str(),
                path = request.path,
                failure_kind = failure.kind().label(),
                "console request did not succeed"
            );
        }
        outcome
    };
    (CancelHandle { abort }, future)
}

/// Runs a request to completion without exposing the cancel handle.
pub async fn execute_once<T>(transport: Arc<T>, request: ApiRequest) -> RequestOutcome<Value>
where
    T: Transport + ?Sized,
{
    let (_cancel, future) = execute(transport, request);
    future.await
}
