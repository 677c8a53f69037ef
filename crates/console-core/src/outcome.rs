use thiserror::Error;

/// Result of one request issued through the lifecycle wrapper.
///
/// The failure side is classified once, at the transport boundary; callers
/// render [`RequestFailure`] through its `Display` impl and never re-inspect
/// message text to decide what went wrong.
pub type RequestOutcome<T> = Result<T, RequestFailure>;

pub const TIMEOUT_MESSAGE: &str = "Request timed out. The server may be overloaded.";
pub const UNREACHABLE_MESSAGE: &str =
    "Cannot reach backend. Please check if the backend server is running.";
pub const CANCELLED_MESSAGE: &str = "Request was cancelled.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFailure {
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },
    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,
    #[error("{}", UNREACHABLE_MESSAGE)]
    NetworkUnreachable { detail: String },
    #[error("{}", CANCELLED_MESSAGE)]
    Cancelled,
    #[error("{message}")]
    Malformed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Http,
    Timeout,
    NetworkUnreachable,
    Cancelled,
    Malformed,
}

impl FailureKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Timeout => "timeout",
            Self::NetworkUnreachable => "network_unreachable",
            Self::Cancelled => "cancelled",
            Self::Malformed => "malformed",
        }
    }
}

impl RequestFailure {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Http { .. } => FailureKind::Http,
            Self::Timeout => FailureKind::Timeout,
            Self::NetworkUnreachable { .. } => FailureKind::NetworkUnreachable,
            Self::Cancelled => FailureKind::Cancelled,
            Self::Malformed { .. } => FailureKind::Malformed,
        }
    }

    /// Classifies a received status code; `None` for 2xx.
    #[must_use]
    pub fn from_status(status: u16) -> Option<Self> {
        if (200..=299).contains(&status) {
            None
        } else {
            Some(Self::Http { status })
        }
    }

    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self::NetworkUnreachable {
            detail: detail.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Failure of an operator action: either the request itself failed, or the
/// backend answered but the payload reported a semantic failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Request(#[from] RequestFailure),
    #[error("{0}")]
    Application(String),
}

/// Decodes a successful JSON payload into a typed response.
pub fn decode_payload<T>(payload: serde_json::Value) -> Result<T, RequestFailure>
where
    T: for<'de> serde::Deserialize<'de>,
{
    serde_json::from_value(payload)
        .map_err(|error| RequestFailure::malformed(format!("failed to decode response: {error}")))
}
