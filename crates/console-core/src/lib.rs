#![cfg_attr(test, allow(clippy::expect_used))]

//! Session controller for the agent console.
//!
//! Everything here is sans-IO: the controller never touches the network or
//! a clock. Callers pass the current time in milliseconds, execute the
//! requests it plans and feed outcomes back as completions.

pub mod api;
pub mod chat;
pub mod config;
pub mod controller;
pub mod mode;
pub mod notification;
pub mod outcome;
pub mod poller;
pub mod settings;
pub mod shortcuts;

pub use api::{AgentAction, ApiRequest, Endpoint, HttpMethod, KeyMap};
pub use chat::{ChatTranscript, ChatTurn, TurnId, TurnRole, TurnStatus};
pub use config::{ConfigError, ConsoleConfig, ConsoleTimings};
pub use controller::{
    BusyFlags, Command, ConsoleController, ConsoleView, Effect, PlannedRequest, RequestTicket,
};
pub use mode::{InteractionMode, ModeStateMachine, ModeTransition};
pub use notification::{Notification, NotificationPhase, NotificationQueue, Severity};
pub use outcome::{
    ActionError, FailureKind, RequestFailure, RequestOutcome, decode_payload,
};
pub use poller::{LogSnapshot, PollDecision, PollSkipReason, PollerState};
pub use settings::{SettingEntry, SettingsState, SettingsView};
