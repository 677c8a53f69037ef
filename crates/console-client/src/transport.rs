use async_trait::async_trait;
use manus_console_core::{ApiRequest, RequestOutcome};
use serde_json::Value;

/// Sends one planned request and classifies the result.
///
/// Implementations report transport failures as [`RequestFailure`] variants
/// and never enforce the request deadline themselves; the lifecycle wrapper
/// owns timeout and cancellation.
///
/// [`RequestFailure`]: manus_console_core::RequestFailure
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: &ApiRequest) -> RequestOutcome<Value>;
}
