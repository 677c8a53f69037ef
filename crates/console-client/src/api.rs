use std::sync::Arc;

use manus_console_core::api::{AgentActionResponse, ChatResponse, LogsResponse, decode_key_map};
use manus_console_core::{
    ActionError, AgentAction, ConsoleConfig, ConsoleTimings, Endpoint, KeyMap, decode_payload,
};

use crate::http::{ConsoleClientError, HttpTransport};
use crate::lifecycle::execute_once;
use crate::transport::Transport;

/// Typed one-shot calls against the console backend, each going through
/// the lifecycle wrapper with its configured deadline.
#[derive(Debug)]
pub struct ConsoleApi<T: Transport + ?Sized> {
    transport: Arc<T>,
    timings: ConsoleTimings,
}

impl<T: Transport + ?Sized> Clone for ConsoleApi<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            timings: self.timings,
        }
    }
}

impl ConsoleApi<HttpTransport> {
    pub fn over_http(config: &ConsoleConfig) -> Result<Self, ConsoleClientError> {
        let transport = HttpTransport::new(&config.backend_base_url)?;
        Ok(Self::new(Arc::new(transport), config.timings))
    }
}

impl<T: Transport + ?Sized> ConsoleApi<T> {
    #[must_use]
    pub fn new(transport: Arc<T>, timings: ConsoleTimings) -> Self {
        Self { transport, timings }
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub async fn fetch_logs(&self) -> Result<Vec<String>, ActionError> {
        let payload = self.call(Endpoint::Logs).await?;
        let response: LogsResponse = decode_payload(payload)?;
        Ok(response.logs)
    }

    pub async fn start_agent(&self, agent_type: &str) -> Result<AgentActionResponse, ActionError> {
        let payload = self
            .call(Endpoint::StartAgent {
                agent_type: agent_type.trim().to_string(),
            })
            .await?;
        AgentAction::Start.interpret(payload)
    }

    pub async fn stop_agent(&self) -> Result<AgentActionResponse, ActionError> {
        let payload = self.call(Endpoint::StopAgent).await?;
        AgentAction::Stop.interpret(payload)
    }

    pub async fn chat(&self, input: &str) -> Result<ChatResponse, ActionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ActionError::Application(
                "message must not be empty".to_string(),
            ));
        }
        let payload = self
            .call(Endpoint::Chat {
                input: input.to_string(),
            })
            .await?;
        Ok(decode_payload(payload)?)
    }

    pub async fn load_keys(&self) -> Result<KeyMap, ActionError> {
        let payload = self.call(Endpoint::LoadKeys).await?;
        Ok(decode_key_map(payload)?)
    }

    pub async fn save_keys(&self, keys: &KeyMap) -> Result<(), ActionError> {
        self.call(Endpoint::SaveKeys { keys: keys.clone() })
            .await
            .map(|_| ())
    }

    async fn call(&self, endpoint: Endpoint) -> Result<serde_json::Value, ActionError> {
        let request = endpoint.plan(&self.timings);
        tracing::debug!(
            endpoint = endpoint.label(),
            method = request.method.as_str(),
            path = request.path,
            "console api call"
        );
        execute_once(Arc::clone(&self.transport), request)
            .await
            .map_err(ActionError::from)
    }
}
