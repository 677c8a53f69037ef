use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::api::{AgentAction, ApiRequest, ChatResponse, Endpoint, LogsResponse, decode_key_map};
use crate::chat::{ChatTranscript, ChatTurn, TurnId};
use crate::config::ConsoleConfig;
use crate::mode::{InteractionMode, ModeStateMachine};
use crate::notification::{Notification, NotificationQueue, Severity};
use crate::outcome::{ActionError, RequestOutcome, decode_payload};
use crate::poller::{LogSnapshot, PollDecision, PollerState};
use crate::settings::{SettingEntry, SettingsState, SettingsView};

pub const CHAT_CLEARED_TEXT: &str = "Chat cleared";
pub const CHAT_AGENT_ERROR_TEXT: &str = "Agent responded with an error";
pub const KEYS_SAVED_TEXT: &str = "API keys saved";

/// Operator intent, one variant per UI action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Activate(InteractionMode),
    RefreshLogs,
    FollowUpRefresh,
    Tick,
    VisibilityChanged { visible: bool },
    SelectAgentType(String),
    /// Starts the agent. An explicit type is selected first; an unknown one
    /// rejects the whole start.
    StartAgent { agent_type: Option<String> },
    StopAgent,
    SendChat(String),
    ClearChat,
    EditSettings,
    CancelSettingsEdit,
    SetSetting { name: String, value: String },
    SaveSettings,
    ReloadSettings,
    DismissNotification,
}

/// Correlates an issued request with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRequest {
    pub ticket: RequestTicket,
    pub label: &'static str,
    pub request: ApiRequest,
}

/// Work the driving loop performs on the controller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Execute through the lifecycle wrapper and feed the outcome back via
    /// [`ConsoleController::complete`].
    Issue(PlannedRequest),
    /// Dispatch [`Command::FollowUpRefresh`] after `delay_ms`.
    ScheduleFollowUpRefresh { delay_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingRequest {
    Logs,
    Agent(AgentAction),
    Chat { turn: TurnId },
    LoadKeys,
    SaveKeys,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentControlState {
    pub selected_agent_type: String,
    pub starting: bool,
    pub stopping: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusyFlags {
    pub refreshing_logs: bool,
    pub starting_agent: bool,
    pub stopping_agent: bool,
    pub sending_chat: bool,
    pub loading_settings: bool,
    pub saving_settings: bool,
}

/// Everything a view layer renders, taken as one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleView {
    pub mode: InteractionMode,
    pub poller_enabled: bool,
    pub log_pane_text: String,
    pub log_snapshot: Option<LogSnapshot>,
    pub logs_last_refreshed_at_ms: Option<u64>,
    pub turns: Vec<ChatTurn>,
    pub notification: Option<Notification>,
    pub settings_view: SettingsView,
    pub settings_entries: Vec<SettingEntry>,
    pub settings_loaded: bool,
    pub settings_error: Option<String>,
    pub agent_types: Vec<String>,
    pub selected_agent_type: String,
    pub agent_error: Option<String>,
    pub busy: BusyFlags,
}

#[derive(Debug)]
pub struct ConsoleController {
    config: ConsoleConfig,
    mode: ModeStateMachine,
    poller: PollerState,
    chat: ChatTranscript,
    settings: SettingsState,
    notifications: NotificationQueue,
    agent: AgentControlState,
    pending: BTreeMap<RequestTicket, PendingRequest>,
    next_ticket: u64,
    booted: bool,
}

impl ConsoleController {
    #[must_use]
    pub fn new(config: ConsoleConfig) -> Self {
        let timings = config.timings;
        let agent = AgentControlState {
            selected_agent_type: config.default_agent_type.clone(),
            starting: false,
            stopping: false,
            last_error: None,
        };
        Self {
            mode: ModeStateMachine::default(),
            poller: PollerState::new(timings.poll_interval_ms),
            chat: ChatTranscript::default(),
            settings: SettingsState::default(),
            notifications: NotificationQueue::new(
                timings.notification_visible_ms,
                timings.notification_fade_ms,
            ),
            agent,
            pending: BTreeMap::new(),
            next_ticket: 1,
            booted: false,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    #[must_use]
    pub fn mode(&self) -> InteractionMode {
        self.mode.active()
    }

    #[must_use]
    pub fn poller(&self) -> &PollerState {
        &self.poller
    }

    #[must_use]
    pub fn transcript(&self) -> &ChatTranscript {
        &self.chat
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsState {
        &self.settings
    }

    #[must_use]
    pub fn agent(&self) -> &AgentControlState {
        &self.agent
    }

    #[must_use]
    pub fn notification(&self) -> Option<&Notification> {
        self.notifications.current()
    }

    #[must_use]
    pub fn outstanding_requests(&self) -> usize {
        self.pending.len()
    }

    /// Runs the enter hook of the initial mode. Only the first call has an
    /// effect.
    pub fn boot(&mut self, now_ms: u64) -> Vec<Effect> {
        if self.booted {
            return Vec::new();
        }
        self.booted = true;
        tracing::debug!(now_ms, mode = self.mode.active().as_str(), "console booted");
        let mut effects = Vec::new();
        self.enter_mode(self.mode.active(), &mut effects);
        effects
    }

    pub fn handle(&mut self, command: Command, now_ms: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        match command {
            Command::Activate(mode) => {
                if let Some(transition) = self.mode.activate(mode) {
                    if transition.exited == InteractionMode::Agent {
                        self.poller.on_mode_change(false);
                    }
                    self.enter_mode(transition.entered, &mut effects);
                }
            }
            Command::RefreshLogs => {
                let decision = self.poller.request_manual();
                self.issue_logs(decision, &mut effects);
            }
            Command::FollowUpRefresh => {
                let decision = self.poller.request_follow_up();
                self.issue_logs(decision, &mut effects);
            }
            Command::Tick => {
                let decision = self.poller.on_tick();
                self.issue_logs(decision, &mut effects);
            }
            Command::VisibilityChanged { visible } => {
                let decision = self.poller.on_visibility_change(visible);
                self.issue_logs(decision, &mut effects);
            }
            Command::SelectAgentType(name) => {
                self.select_agent_type(&name, now_ms);
            }
            Command::StartAgent { agent_type } => {
                if let Some(name) = agent_type {
                    if !self.select_agent_type(&name, now_ms) {
                        return effects;
                    }
                }
                if !self.agent.starting {
                    self.agent.starting = true;
                    let endpoint = Endpoint::StartAgent {
                        agent_type: self.agent.selected_agent_type.clone(),
                    };
                    effects.push(self.issue(endpoint, PendingRequest::Agent(AgentAction::Start)));
                }
            }
            Command::StopAgent => {
                if !self.agent.stopping {
                    self.agent.stopping = true;
                    effects.push(
                        self.issue(Endpoint::StopAgent, PendingRequest::Agent(AgentAction::Stop)),
                    );
                }
            }
            Command::SendChat(text) => {
                if let Some(exchange) = self.chat.begin_exchange(&text) {
                    effects.push(self.issue(
                        Endpoint::Chat {
                            input: exchange.input,
                        },
                        PendingRequest::Chat {
                            turn: exchange.agent_turn,
                        },
                    ));
                }
            }
            Command::ClearChat => {
                self.chat.clear();
                self.notifications
                    .notify(CHAT_CLEARED_TEXT, Severity::Success, now_ms);
            }
            Command::EditSettings => {
                self.settings.edit();
            }
            Command::CancelSettingsEdit => {
                self.settings.cancel_edit();
            }
            Command::SetSetting { name, value } => {
                self.settings.set_value(&name, &value);
            }
            Command::SaveSettings => {
                if let Some(keys) = self.settings.begin_save() {
                    effects.push(self.issue(Endpoint::SaveKeys { keys }, PendingRequest::SaveKeys));
                }
            }
            Command::ReloadSettings => self.load_settings(&mut effects),
            Command::DismissNotification => {
                self.notifications.dismiss();
            }
        }
        effects
    }

    /// Feeds back the outcome of an issued request. Unknown tickets are
    /// ignored.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        outcome: RequestOutcome<Value>,
        now_ms: u64,
    ) -> Vec<Effect> {
        let Some(pending) = self.pending.remove(&ticket) else {
            tracing::debug!(%ticket, "ignoring completion for unknown request");
            return Vec::new();
        };
        if let Err(failure) = &outcome {
            tracing::warn!(
                %ticket,
                failure_kind = failure.kind().label(),
                error = %failure,
                "console request failed"
            );
        } else {
            tracing::debug!(%ticket, "console request completed");
        }

        let mut effects = Vec::new();
        match pending {
            PendingRequest::Logs => {
                let result = outcome
                    .and_then(decode_payload::<LogsResponse>)
                    .map(|response| response.logs);
                self.poller.complete(now_ms, result);
            }
            PendingRequest::Agent(action) => {
                match action {
                    AgentAction::Start => self.agent.starting = false,
                    AgentAction::Stop => self.agent.stopping = false,
                }
                let result = outcome
                    .map_err(ActionError::from)
                    .and_then(|payload| action.interpret(payload));
                match result {
                    Ok(_) => {
                        self.agent.last_error = None;
                        self.notifications
                            .notify(action.success_text(), Severity::Success, now_ms);
                        effects.push(Effect::ScheduleFollowUpRefresh {
                            delay_ms: self.config.timings.follow_up_refresh_delay_ms,
                        });
                    }
                    Err(error) => {
                        let message = error.to_string();
                        self.notifications.notify(
                            format!("{}: {message}", action.error_prefix()),
                            Severity::Error,
                            now_ms,
                        );
                        self.agent.last_error = Some(message);
                    }
                }
            }
            PendingRequest::Chat { turn } => {
                match outcome.and_then(decode_payload::<ChatResponse>) {
                    Ok(response) => {
                        let resolution = self.chat.resolve_success(turn, response);
                        if resolution.agent_reported_error {
                            self.notifications
                                .notify(CHAT_AGENT_ERROR_TEXT, Severity::Warning, now_ms);
                        }
                    }
                    Err(failure) => {
                        let message = failure.to_string();
                        self.chat.resolve_failure(turn, &message);
                        self.notifications.notify(
                            format!("Error sending message: {message}"),
                            Severity::Error,
                            now_ms,
                        );
                    }
                }
            }
            PendingRequest::LoadKeys => {
                self.settings
                    .complete_load(outcome.and_then(decode_key_map));
            }
            PendingRequest::SaveKeys => match outcome {
                Ok(_) => {
                    self.settings.complete_save(Ok(()));
                    self.notifications
                        .notify(KEYS_SAVED_TEXT, Severity::Success, now_ms);
                }
                Err(failure) => {
                    let message = failure.to_string();
                    self.settings.complete_save(Err(failure));
                    self.notifications.notify(
                        format!("Error saving keys: {message}"),
                        Severity::Error,
                        now_ms,
                    );
                }
            },
        }
        effects
    }

    pub fn sweep_notifications(&mut self, now_ms: u64) -> bool {
        self.notifications.sweep(now_ms)
    }

    #[must_use]
    pub fn next_notification_deadline_ms(&self) -> Option<u64> {
        self.notifications.next_deadline_ms()
    }

    #[must_use]
    pub fn busy(&self) -> BusyFlags {
        BusyFlags {
            refreshing_logs: self.poller.in_flight(),
            starting_agent: self.agent.starting,
            stopping_agent: self.agent.stopping,
            sending_chat: self.chat.is_pending(),
            loading_settings: self.settings.loading(),
            saving_settings: self.settings.saving(),
        }
    }

    #[must_use]
    pub fn view(&self) -> ConsoleView {
        ConsoleView {
            mode: self.mode.active(),
            poller_enabled: self.poller.enabled(),
            log_pane_text: self.poller.log_pane_text(),
            log_snapshot: self.poller.snapshot().map(<[String]>::to_vec),
            logs_last_refreshed_at_ms: self.poller.last_refreshed_at_ms(),
            turns: self.chat.turns().to_vec(),
            notification: self.notifications.current().cloned(),
            settings_view: self.settings.view(),
            settings_entries: self.settings.entries(),
            settings_loaded: self.settings.loaded(),
            settings_error: self
                .settings
                .save_error()
                .or(self.settings.load_error())
                .map(ToString::to_string),
            agent_types: self.config.agent_types.clone(),
            selected_agent_type: self.agent.selected_agent_type.clone(),
            agent_error: self.agent.last_error.clone(),
            busy: self.busy(),
        }
    }

    fn enter_mode(&mut self, mode: InteractionMode, effects: &mut Vec<Effect>) {
        match mode {
            InteractionMode::Agent => {
                let decision = self.poller.on_mode_change(true);
                self.issue_logs(decision, effects);
            }
            InteractionMode::Chat => {}
            InteractionMode::Settings => self.load_settings(effects),
        }
    }

    fn load_settings(&mut self, effects: &mut Vec<Effect>) {
        if self.settings.begin_load() {
            effects.push(self.issue(Endpoint::LoadKeys, PendingRequest::LoadKeys));
        }
    }

    /// Returns false, with a warning notification, for a type the config
    /// does not list. The previous selection is kept.
    fn select_agent_type(&mut self, name: &str, now_ms: u64) -> bool {
        let name = name.trim();
        if self.config.agent_types.iter().any(|known| known == name) {
            self.agent.selected_agent_type = name.to_string();
            return true;
        }
        tracing::warn!(agent_type = name, "unknown agent type selected");
        self.notifications.notify(
            format!("Unknown agent type: {name}"),
            Severity::Warning,
            now_ms,
        );
        false
    }

    fn issue_logs(&mut self, decision: PollDecision, effects: &mut Vec<Effect>) {
        match decision {
            PollDecision::Issue => effects.push(self.issue(Endpoint::Logs, PendingRequest::Logs)),
            PollDecision::Skip(reason) => {
                tracing::trace!(reason = reason.as_str(), "log refresh skipped");
            }
        }
    }

    fn issue(&mut self, endpoint: Endpoint, pending: PendingRequest) -> Effect {
        let ticket = RequestTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.saturating_add(1);
        self.pending.insert(ticket, pending);
        let request = endpoint.plan(&self.config.timings);
        tracing::debug!(
            %ticket,
            endpoint = endpoint.label(),
            method = request.method.as_str(),
            path = request.path,
            timeout_ms = request.timeout_ms,
            "console request issued"
        );
        Effect::Issue(PlannedRequest {
            ticket,
            label: endpoint.label(),
            request,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::{AGENT_START_PATH, CHAT_PATH, KEYS_PATH, LOGS_PATH};
    use crate::chat::TurnStatus;
    use crate::notification::NotificationPhase;
    use crate::outcome::RequestFailure;

    fn issued(effects: &[Effect]) -> Vec<PlannedRequest> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Issue(planned) => Some(planned.clone()),
                Effect::ScheduleFollowUpRefresh { .. } => None,
            })
            .collect()
    }

    fn single(effects: &[Effect]) -> PlannedRequest {
        let mut requests = issued(effects);
        assert_eq!(requests.len(), 1, "expected one request, got {effects:?}");
        requests.remove(0)
    }

    fn booted() -> ConsoleController {
        let mut controller = ConsoleController::new(ConsoleConfig::default());
        let boot = single(&controller.boot(0));
        assert_eq!(boot.request.path, LOGS_PATH);
        controller.complete(boot.ticket, Ok(json!({ "logs": ["ready"] })), 1);
        controller
    }

    #[test]
    fn boot_refreshes_once() {
        let mut controller = ConsoleController::new(ConsoleConfig::default());
        assert_eq!(issued(&controller.boot(0)).len(), 1);
        assert!(controller.boot(5).is_empty());
        assert!(controller.busy().refreshing_logs);
    }

    #[test]
    fn back_to_back_refreshes_issue_one_request() {
        let mut controller = booted();
        let first = controller.handle(Command::RefreshLogs, 10);
        let second = controller.handle(Command::RefreshLogs, 11);
        assert_eq!(issued(&first).len(), 1);
        assert!(second.is_empty());
        assert_eq!(controller.outstanding_requests(), 1);
    }

    #[test]
    fn agent_chat_agent_refreshes_once_on_reentry() {
        let mut controller = booted();
        let into_chat = controller.handle(Command::Activate(InteractionMode::Chat), 10);
        assert!(into_chat.is_empty());
        assert!(!controller.poller().enabled());

        let back = controller.handle(Command::Activate(InteractionMode::Agent), 20);
        assert_eq!(single(&back).request.path, LOGS_PATH);
        assert!(controller.handle(Command::Activate(InteractionMode::Agent), 21).is_empty());
    }

    #[test]
    fn hidden_tab_suppresses_ticks() {
        let mut controller = booted();
        assert!(
            controller
                .handle(Command::VisibilityChanged { visible: false }, 5)
                .is_empty()
        );
        assert!(!controller.view().poller_enabled);
        assert!(controller.handle(Command::Tick, 30_000).is_empty());
        assert!(controller.handle(Command::Tick, 60_000).is_empty());

        let visible = controller.handle(Command::VisibilityChanged { visible: true }, 61_000);
        assert_eq!(issued(&visible).len(), 1);
    }

    #[test]
    fn ticks_outside_agent_mode_do_nothing() {
        let mut controller = booted();
        controller.handle(Command::Activate(InteractionMode::Chat), 2);
        assert!(controller.handle(Command::Tick, 30_000).is_empty());
        let manual = controller.handle(Command::RefreshLogs, 30_001);
        assert_eq!(issued(&manual).len(), 1);
    }

    #[test]
    fn chat_success_finalizes_turn() {
        let mut controller = booted();
        controller.handle(Command::Activate(InteractionMode::Chat), 2);
        let send = single(&controller.handle(Command::SendChat("hi".to_string()), 3));
        assert_eq!(send.request.path, CHAT_PATH);
        assert_eq!(send.request.body, Some(json!({ "input": "hi" })));
        assert!(controller.view().busy.sending_chat);

        controller.complete(send.ticket, Ok(json!({ "output": "ok" })), 4);
        let view = controller.view();
        assert_eq!(view.turns.len(), 2);
        assert_eq!(view.turns[1].content, "ok");
        assert_eq!(view.turns[1].status, TurnStatus::Final);
        assert!(view.notification.is_none());
        assert!(!view.busy.sending_chat);
    }

    #[test]
    fn chat_sends_are_guarded() {
        let mut controller = booted();
        assert!(controller.handle(Command::SendChat(String::new()), 2).is_empty());
        assert!(controller.handle(Command::SendChat("   ".to_string()), 2).is_empty());
        assert!(controller.transcript().turns().is_empty());

        let first = controller.handle(Command::SendChat("one".to_string()), 3);
        assert_eq!(issued(&first).len(), 1);
        assert!(controller.handle(Command::SendChat("hi".to_string()), 4).is_empty());
        let pending = controller
            .transcript()
            .turns()
            .iter()
            .filter(|turn| turn.status == TurnStatus::Pending)
            .count();
        assert_eq!(pending, 1);
    }

    #[test]
    fn chat_timeout_renders_error_turn_and_notification() {
        let mut controller = booted();
        let send = single(&controller.handle(Command::SendChat("hi".to_string()), 2));
        controller.complete(send.ticket, Err(RequestFailure::Timeout), 30_002);

        let view = controller.view();
        assert!(view.turns[1].content.contains("timed out"));
        assert!(view.turns[1].failed);
        let notification = view.notification.expect("error notification");
        assert_eq!(notification.severity, Severity::Error);
        assert!(notification.text.starts_with("Error sending message: "));
    }

    #[test]
    fn chat_error_flag_emits_warning() {
        let mut controller = booted();
        let send = single(&controller.handle(Command::SendChat("hi".to_string()), 2));
        controller.complete(
            send.ticket,
            Ok(json!({ "output": "partial", "error": true })),
            3,
        );
        let notification = controller.notification().expect("warning");
        assert_eq!(notification.severity, Severity::Warning);
        assert_eq!(notification.text, CHAT_AGENT_ERROR_TEXT);
        assert_eq!(controller.transcript().turns()[1].content, "partial");
    }

    #[test]
    fn clear_empties_turns_and_notifies() {
        let mut controller = booted();
        let send = single(&controller.handle(Command::SendChat("hi".to_string()), 2));
        controller.complete(send.ticket, Ok(json!({ "output": "ok" })), 3);
        controller.handle(Command::ClearChat, 4);

        let view = controller.view();
        assert!(view.turns.is_empty());
        assert_eq!(
            view.notification.map(|notification| notification.text),
            Some(CHAT_CLEARED_TEXT.to_string())
        );
    }

    #[test]
    fn chat_resolves_after_leaving_chat_mode() {
        let mut controller = booted();
        controller.handle(Command::Activate(InteractionMode::Chat), 2);
        let send = single(&controller.handle(Command::SendChat("hi".to_string()), 3));
        controller.handle(Command::Activate(InteractionMode::Settings), 4);
        controller.complete(send.ticket, Ok(json!({ "output": "done" })), 5);
        assert_eq!(controller.transcript().turns()[1].content, "done");
    }

    #[test]
    fn start_success_notifies_and_schedules_follow_up() {
        let mut controller = booted();
        let start = single(&controller.handle(
            Command::StartAgent {
                agent_type: Some("manus".to_string()),
            },
            2,
        ));
        assert_eq!(start.request.path, AGENT_START_PATH);
        assert_eq!(start.request.body, Some(json!({ "agent_type": "manus" })));
        assert!(controller.handle(Command::StartAgent { agent_type: None }, 3).is_empty());

        let effects = controller.complete(start.ticket, Ok(json!({ "status": "success" })), 4);
        assert_eq!(
            effects,
            vec![Effect::ScheduleFollowUpRefresh { delay_ms: 1_000 }]
        );
        assert_eq!(
            controller.notification().map(|notification| notification.text.as_str()),
            Some("Agent started successfully")
        );

        let follow_up = controller.handle(Command::FollowUpRefresh, 1_004);
        assert_eq!(single(&follow_up).request.path, LOGS_PATH);
    }

    #[test]
    fn start_with_unknown_type_issues_nothing() {
        let mut config = ConsoleConfig::default();
        config.agent_types = vec!["manus".to_string(), "browser".to_string()];
        let mut controller = ConsoleController::new(config);
        let boot = single(&controller.boot(0));
        controller.complete(boot.ticket, Ok(json!({ "logs": [] })), 1);
        controller.handle(Command::SelectAgentType("browser".to_string()), 2);

        let effects = controller.handle(
            Command::StartAgent {
                agent_type: Some("ghost".to_string()),
            },
            3,
        );
        assert!(issued(&effects).is_empty());
        assert!(!controller.busy().starting_agent);
        assert_eq!(controller.agent().selected_agent_type, "browser");
        let notification = controller.notification().expect("warning");
        assert_eq!(notification.severity, Severity::Warning);
        assert_eq!(notification.text, "Unknown agent type: ghost");

        let start = single(&controller.handle(Command::StartAgent { agent_type: None }, 4));
        assert_eq!(start.request.body, Some(json!({ "agent_type": "browser" })));
    }

    #[test]
    fn start_application_error_has_no_follow_up() {
        let mut controller = booted();
        let start = single(&controller.handle(Command::StartAgent { agent_type: None }, 2));
        let effects = controller.complete(start.ticket, Ok(json!({ "status": "error" })), 3);
        assert!(effects.is_empty());

        let notification = controller.notification().expect("error notification");
        assert_eq!(notification.severity, Severity::Error);
        assert_eq!(
            notification.text,
            "Error starting agent: Unknown error starting agent"
        );
        assert!(!controller.busy().starting_agent);
    }

    #[test]
    fn stop_network_failure_reports_classified_message() {
        let mut controller = booted();
        let stop = single(&controller.handle(Command::StopAgent, 2));
        controller.complete(
            stop.ticket,
            Err(RequestFailure::unreachable("connection refused")),
            3,
        );
        let text = &controller.notification().expect("notification").text;
        assert!(text.starts_with("Error stopping agent: Cannot reach backend"));
        assert!(!controller.poller().in_flight());
    }

    #[test]
    fn unknown_agent_type_is_rejected_with_warning() {
        let mut controller = booted();
        controller.handle(Command::SelectAgentType("ghost".to_string()), 1);
        assert_eq!(controller.agent().selected_agent_type, "manus");
        assert_eq!(
            controller.notification().map(|notification| notification.severity),
            Some(Severity::Warning)
        );
    }

    #[test]
    fn settings_entry_loads_and_save_round_trips() {
        let mut controller = booted();
        let load = single(&controller.handle(Command::Activate(InteractionMode::Settings), 2));
        assert_eq!(load.request.path, KEYS_PATH);
        controller.complete(load.ticket, Ok(json!({ "OPENAI_API_KEY": "sk" })), 3);
        assert_eq!(controller.view().settings_entries[0].display, "********");

        controller.handle(Command::EditSettings, 4);
        controller.handle(
            Command::SetSetting {
                name: "OPENAI_API_KEY".to_string(),
                value: "sk-2".to_string(),
            },
            5,
        );
        let save = single(&controller.handle(Command::SaveSettings, 6));
        assert_eq!(save.request.body, Some(json!({ "OPENAI_API_KEY": "sk-2" })));
        controller.complete(save.ticket, Ok(json!({ "status": "ok" })), 7);

        let view = controller.view();
        assert_eq!(view.settings_view, SettingsView::ReadOnly);
        assert_eq!(
            view.notification.map(|notification| notification.text),
            Some(KEYS_SAVED_TEXT.to_string())
        );
    }

    #[test]
    fn settings_save_failure_returns_to_read_only() {
        let mut controller = booted();
        let load = single(&controller.handle(Command::Activate(InteractionMode::Settings), 2));
        controller.complete(load.ticket, Ok(json!({ "K": "old" })), 3);
        controller.handle(Command::EditSettings, 4);
        controller.handle(
            Command::SetSetting {
                name: "K".to_string(),
                value: "new".to_string(),
            },
            5,
        );
        let save = single(&controller.handle(Command::SaveSettings, 6));
        assert_eq!(save.request.body, Some(json!({ "K": "new" })));
        controller.complete(save.ticket, Err(RequestFailure::Http { status: 500 }), 7);

        let view = controller.view();
        assert_eq!(view.settings_view, SettingsView::ReadOnly);
        assert!(!view.busy.saving_settings);
        assert_eq!(
            view.settings_error.as_deref(),
            Some("HTTP error! status: 500")
        );
        assert_eq!(
            controller.settings().keys().get("K").map(String::as_str),
            Some("new")
        );
        let notification = controller.notification().expect("error notification");
        assert_eq!(notification.severity, Severity::Error);
        assert_eq!(notification.text, "Error saving keys: HTTP error! status: 500");
    }

    #[test]
    fn unknown_tickets_are_ignored() {
        let mut controller = booted();
        let effects = controller.complete(RequestTicket(999), Ok(json!({ "logs": [] })), 2);
        assert!(effects.is_empty());
        assert_eq!(controller.view().log_pane_text, "ready");
    }

    #[test]
    fn two_notifications_leave_only_the_latest() {
        let mut controller = booted();
        controller.handle(Command::ClearChat, 1);
        controller.handle(Command::SelectAgentType("nope".to_string()), 2);
        let notification = controller.notification().expect("latest notification");
        assert_eq!(notification.text, "Unknown agent type: nope");

        assert!(controller.sweep_notifications(4_002));
        assert_eq!(
            controller.notification().map(|notification| notification.phase),
            Some(NotificationPhase::FadingOut)
        );
        assert!(controller.sweep_notifications(4_302));
        assert!(controller.notification().is_none());
    }

    #[test]
    fn logs_failure_is_inline_only() {
        let mut controller = booted();
        let refresh = single(&controller.handle(Command::RefreshLogs, 2));
        controller.complete(refresh.ticket, Err(RequestFailure::Http { status: 502 }), 3);
        let view = controller.view();
        assert!(view.notification.is_none());
        assert!(
            view.log_pane_text
                .starts_with("Error loading logs: HTTP error! status: 502")
        );
        assert_eq!(view.log_snapshot, Some(vec!["ready".to_string()]));
    }
}
