use manus_console_core::{
    BusyFlags, Command, InteractionMode, RequestFailure, RequestOutcome, Severity, TurnRole,
};
use serde_json::Value;

pub(crate) const AGENT_MODE_BUTTON_ID: &str = "agent-mode-btn";
pub(crate) const CHAT_MODE_BUTTON_ID: &str = "chat-mode-btn";
pub(crate) const SETTINGS_MODE_BUTTON_ID: &str = "settings-mode-btn";
pub(crate) const REFRESH_LOGS_BUTTON_ID: &str = "refresh-logs-btn";
pub(crate) const START_AGENT_BUTTON_ID: &str = "start-agent-btn";
pub(crate) const STOP_AGENT_BUTTON_ID: &str = "stop-agent-btn";
pub(crate) const AGENT_SELECT_ID: &str = "agent-select";
pub(crate) const SEND_BUTTON_ID: &str = "send-button";
pub(crate) const CLEAR_CHAT_BUTTON_ID: &str = "clear-chat-btn";
pub(crate) const CHAT_TEXTAREA_ID: &str = "chat-textarea";
pub(crate) const AGENT_LOGS_ID: &str = "agent-logs";
pub(crate) const CHAT_HISTORY_ID: &str = "chat-history";
pub(crate) const SETTINGS_LIST_ID: &str = "settings-list";
pub(crate) const EDIT_KEYS_BUTTON_ID: &str = "edit-keys-btn";
pub(crate) const SAVE_KEYS_BUTTON_ID: &str = "save-keys-btn";
pub(crate) const CANCEL_KEYS_BUTTON_ID: &str = "cancel-keys-btn";
pub(crate) const RELOAD_KEYS_BUTTON_ID: &str = "reload-keys-btn";

pub(crate) const ACTIVE_CLASS: &str = "active";
pub(crate) const CHAT_ENTRY_CLASS: &str = "chat-entry";
pub(crate) const NOTIFICATION_CLASS: &str = "notification";
pub(crate) const KEY_INPUT_CLASS: &str = "key-input";
pub(crate) const KEY_NAME_ATTRIBUTE: &str = "data-key";

/// Buttons whose click is wired on boot. Missing optional buttons are
/// skipped; the mode buttons and chat controls are required.
pub(crate) const CLICK_TARGETS: [&str; 12] = [
    AGENT_MODE_BUTTON_ID,
    CHAT_MODE_BUTTON_ID,
    SETTINGS_MODE_BUTTON_ID,
    REFRESH_LOGS_BUTTON_ID,
    START_AGENT_BUTTON_ID,
    STOP_AGENT_BUTTON_ID,
    SEND_BUTTON_ID,
    CLEAR_CHAT_BUTTON_ID,
    EDIT_KEYS_BUTTON_ID,
    SAVE_KEYS_BUTTON_ID,
    CANCEL_KEYS_BUTTON_ID,
    RELOAD_KEYS_BUTTON_ID,
];

pub(crate) const REQUIRED_ELEMENT_IDS: [&str; 10] = [
    AGENT_MODE_BUTTON_ID,
    CHAT_MODE_BUTTON_ID,
    SETTINGS_MODE_BUTTON_ID,
    REFRESH_LOGS_BUTTON_ID,
    START_AGENT_BUTTON_ID,
    STOP_AGENT_BUTTON_ID,
    SEND_BUTTON_ID,
    CHAT_TEXTAREA_ID,
    AGENT_LOGS_ID,
    CHAT_HISTORY_ID,
];

/// What a click on a bound element asks for. Intents that need to read the
/// DOM first (composer text, selected agent, edited key values) are
/// resolved by the shell before becoming commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ButtonIntent {
    Dispatch(Command),
    SendComposer,
    StartSelectedAgent,
    SaveEditedKeys,
}

pub(crate) fn button_intent(id: &str) -> Option<ButtonIntent> {
    let intent = match id {
        AGENT_MODE_BUTTON_ID => ButtonIntent::Dispatch(Command::Activate(InteractionMode::Agent)),
        CHAT_MODE_BUTTON_ID => ButtonIntent::Dispatch(Command::Activate(InteractionMode::Chat)),
        SETTINGS_MODE_BUTTON_ID => {
            ButtonIntent::Dispatch(Command::Activate(InteractionMode::Settings))
        }
        REFRESH_LOGS_BUTTON_ID => ButtonIntent::Dispatch(Command::RefreshLogs),
        START_AGENT_BUTTON_ID => ButtonIntent::StartSelectedAgent,
        STOP_AGENT_BUTTON_ID => ButtonIntent::Dispatch(Command::StopAgent),
        SEND_BUTTON_ID => ButtonIntent::SendComposer,
        CLEAR_CHAT_BUTTON_ID => ButtonIntent::Dispatch(Command::ClearChat),
        EDIT_KEYS_BUTTON_ID => ButtonIntent::Dispatch(Command::EditSettings),
        SAVE_KEYS_BUTTON_ID => ButtonIntent::SaveEditedKeys,
        CANCEL_KEYS_BUTTON_ID => ButtonIntent::Dispatch(Command::CancelSettingsEdit),
        RELOAD_KEYS_BUTTON_ID => ButtonIntent::Dispatch(Command::ReloadSettings),
        _ => return None,
    };
    Some(intent)
}

pub(crate) fn mode_button_id(mode: InteractionMode) -> &'static str {
    match mode {
        InteractionMode::Agent => AGENT_MODE_BUTTON_ID,
        InteractionMode::Chat => CHAT_MODE_BUTTON_ID,
        InteractionMode::Settings => SETTINGS_MODE_BUTTON_ID,
    }
}

pub(crate) fn mode_section_id(mode: InteractionMode) -> String {
    format!("{}-mode", mode.as_str())
}

pub(crate) fn notification_class(severity: Severity) -> String {
    format!("{NOTIFICATION_CLASS} {NOTIFICATION_CLASS}-{}", severity.as_str())
}

pub(crate) fn turn_class(role: TurnRole, failed: bool) -> &'static str {
    match (role, failed) {
        (TurnRole::User, _) => "user",
        (TurnRole::Agent, false) => "agent",
        (TurnRole::Agent, true) => "agent error",
    }
}

pub(crate) fn key_input_id(name: &str) -> String {
    format!("{KEY_INPUT_CLASS}-{name}")
}

/// Label and disabled state for one busy-aware button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ButtonState {
    pub(crate) id: &'static str,
    pub(crate) label: &'static str,
    pub(crate) disabled: bool,
}

pub(crate) fn busy_buttons(busy: BusyFlags) -> [ButtonState; 5] {
    let pick = |flag: bool, busy_label: &'static str, idle_label: &'static str| {
        if flag { busy_label } else { idle_label }
    };
    [
        ButtonState {
            id: REFRESH_LOGS_BUTTON_ID,
            label: pick(busy.refreshing_logs, "Loading...", "Refresh Logs"),
            disabled: busy.refreshing_logs,
        },
        ButtonState {
            id: START_AGENT_BUTTON_ID,
            label: pick(busy.starting_agent, "Starting...", "Start Agent"),
            disabled: busy.starting_agent,
        },
        ButtonState {
            id: STOP_AGENT_BUTTON_ID,
            label: pick(busy.stopping_agent, "Stopping...", "Stop Agent"),
            disabled: busy.stopping_agent,
        },
        ButtonState {
            id: SEND_BUTTON_ID,
            label: pick(busy.sending_chat, "Sending...", "Send"),
            disabled: busy.sending_chat,
        },
        ButtonState {
            id: SAVE_KEYS_BUTTON_ID,
            label: pick(busy.saving_settings, "Saving...", "Save"),
            disabled: busy.saving_settings,
        },
    ]
}

/// Classifies a completed fetch the same way the native transport does:
/// non-2xx is an HTTP failure and a blank body decodes as `null`.
pub(crate) fn decode_response(status: u16, body: &str) -> RequestOutcome<Value> {
    if let Some(failure) = RequestFailure::from_status(status) {
        return Err(failure);
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
        .map_err(|error| RequestFailure::malformed(format!("failed to decode response: {error}")))
}

/// Maps a rejected fetch. An abort is a timeout when the deadline fired and
/// a cancellation otherwise.
pub(crate) fn classify_fetch_error(name: &str, message: &str, deadline_fired: bool) -> RequestFailure {
    if name == "AbortError" {
        if deadline_fired {
            RequestFailure::Timeout
        } else {
            RequestFailure::Cancelled
        }
    } else {
        RequestFailure::unreachable(message)
    }
}
