use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ConsoleTimings;
use crate::outcome::ActionError;

pub const LOGS_PATH: &str = "/api/agent/logs";
pub const AGENT_START_PATH: &str = "/api/agent/start";
pub const AGENT_STOP_PATH: &str = "/api/agent/stop";
pub const CHAT_PATH: &str = "/api/chat";
pub const KEYS_PATH: &str = "/api/keys";

pub const STATUS_SUCCESS: &str = "success";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A fully planned backend call: method, path relative to the backend base
/// URL, optional JSON body and the deadline it must finish within.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: &'static str,
    pub body: Option<Value>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Logs,
    StartAgent { agent_type: String },
    StopAgent,
    Chat { input: String },
    LoadKeys,
    SaveKeys { keys: KeyMap },
}

impl Endpoint {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::StartAgent { .. } => "agent_start",
            Self::StopAgent => "agent_stop",
            Self::Chat { .. } => "chat",
            Self::LoadKeys => "keys_load",
            Self::SaveKeys { .. } => "keys_save",
        }
    }

    #[must_use]
    pub fn plan(&self, timings: &ConsoleTimings) -> ApiRequest {
        match self {
            Self::Logs => ApiRequest {
                method: HttpMethod::Get,
                path: LOGS_PATH,
                body: None,
                timeout_ms: timings.logs_timeout_ms,
            },
            Self::StartAgent { agent_type } => ApiRequest {
                method: HttpMethod::Post,
                path: AGENT_START_PATH,
                body: Some(to_body(&AgentStartRequest {
                    agent_type: agent_type.clone(),
                })),
                timeout_ms: timings.agent_action_timeout_ms,
            },
            Self::StopAgent => ApiRequest {
                method: HttpMethod::Post,
                path: AGENT_STOP_PATH,
                body: None,
                timeout_ms: timings.agent_action_timeout_ms,
            },
            Self::Chat { input } => ApiRequest {
                method: HttpMethod::Post,
                path: CHAT_PATH,
                body: Some(to_body(&ChatRequest {
                    input: input.clone(),
                })),
                timeout_ms: timings.chat_timeout_ms,
            },
            Self::LoadKeys => ApiRequest {
                method: HttpMethod::Get,
                path: KEYS_PATH,
                body: None,
                timeout_ms: timings.settings_timeout_ms,
            },
            Self::SaveKeys { keys } => ApiRequest {
                method: HttpMethod::Post,
                path: KEYS_PATH,
                body: Some(to_body(keys)),
                timeout_ms: timings.settings_timeout_ms,
            },
        }
    }
}

// Request bodies here are plain structs and string maps, which always
// serialize; `Null` only shows up if that ever stops holding.
fn to_body<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub type KeyMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStartRequest {
    pub agent_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentActionResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl AgentActionResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentAction {
    Start,
    Stop,
}

impl AgentAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    #[must_use]
    pub const fn success_text(self) -> &'static str {
        match self {
            Self::Start => "Agent started successfully",
            Self::Stop => "Agent stopped successfully",
        }
    }

    #[must_use]
    pub const fn error_prefix(self) -> &'static str {
        match self {
            Self::Start => "Error starting agent",
            Self::Stop => "Error stopping agent",
        }
    }

    #[must_use]
    pub const fn unknown_error_text(self) -> &'static str {
        match self {
            Self::Start => "Unknown error starting agent",
            Self::Stop => "Unknown error stopping agent",
        }
    }

    /// Reads a start/stop payload. Anything but `status: "success"` is an
    /// application failure carrying the backend message when present.
    pub fn interpret(self, payload: Value) -> Result<AgentActionResponse, ActionError> {
        let response: AgentActionResponse = crate::decode_payload(payload)?;
        if response.is_success() {
            return Ok(response);
        }
        let message = response
            .message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| self.unknown_error_text().to_string());
        Err(ActionError::Application(message))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: bool,
}

/// Decodes the key map, tolerating `null` values from the backend by
/// treating them as unset.
pub fn decode_key_map(payload: Value) -> Result<KeyMap, crate::RequestFailure> {
    let raw: BTreeMap<String, Option<String>> = crate::decode_payload(payload)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| (name, value.unwrap_or_default()))
        .collect())
}
