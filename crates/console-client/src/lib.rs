#![cfg_attr(test, allow(clippy::expect_used))]

pub mod api;
pub mod http;
pub mod lifecycle;
pub mod runtime;
pub mod transport;

pub use api::ConsoleApi;
pub use http::{ConsoleClientError, HttpTransport, classify_reqwest_error};
pub use lifecycle::{CancelHandle, execute, execute_once};
pub use runtime::{ConsoleHandle, ConsoleRuntime, RuntimeClosed};
pub use transport::Transport;
