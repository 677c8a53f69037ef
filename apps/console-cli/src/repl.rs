use manus_console_core::{Command, InteractionMode};
use thiserror::Error;

pub const HELP_TEXT: &str = "\
/agent /chat /settings   switch mode
/refresh                 reload agent logs
/start [type]            start the agent (optionally choosing its type)
/stop                    stop the agent
/clear                   clear the chat
/hide /show              simulate the console losing or regaining focus
/edit /cancel /save      edit, discard or save API keys
/set NAME=VALUE          change a key while editing
/dismiss                 hide the current notification
/help /quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplAction {
    Send(Vec<Command>),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplError {
    #[error("unknown command /{0} (try /help)")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("switch to chat mode with /chat before sending messages")]
    NotInChat,
}

/// Parses one console input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str, mode: InteractionMode) -> Result<Option<ReplAction>, ReplError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        if mode != InteractionMode::Chat {
            return Err(ReplError::NotInChat);
        }
        return Ok(Some(ReplAction::Send(vec![Command::SendChat(
            trimmed.to_string(),
        )])));
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };
    let single = |command: Command| -> Result<Option<ReplAction>, ReplError> {
        Ok(Some(ReplAction::Send(vec![command])))
    };
    match name {
        "agent" => single(Command::Activate(InteractionMode::Agent)),
        "chat" => single(Command::Activate(InteractionMode::Chat)),
        "settings" => single(Command::Activate(InteractionMode::Settings)),
        "refresh" => single(Command::RefreshLogs),
        "start" => single(Command::StartAgent {
            agent_type: (!argument.is_empty()).then(|| argument.to_string()),
        }),
        "stop" => single(Command::StopAgent),
        "clear" => single(Command::ClearChat),
        "hide" => single(Command::VisibilityChanged { visible: false }),
        "show" => single(Command::VisibilityChanged { visible: true }),
        "edit" => single(Command::EditSettings),
        "cancel" => single(Command::CancelSettingsEdit),
        "save" => single(Command::SaveSettings),
        "reload" => single(Command::ReloadSettings),
        "dismiss" => single(Command::DismissNotification),
        "set" => {
            let Some((key, value)) = argument.split_once('=') else {
                return Err(ReplError::Usage("/set NAME=VALUE"));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ReplError::Usage("/set NAME=VALUE"));
            }
            single(Command::SetSetting {
                name: key.to_string(),
                value: value.trim().to_string(),
            })
        }
        "help" => Ok(Some(ReplAction::Help)),
        "quit" | "exit" => Ok(Some(ReplAction::Quit)),
        other => Err(ReplError::UnknownCommand(other.to_string())),
    }
}
