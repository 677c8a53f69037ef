use std::collections::HashMap;

use manus_console_core::{
    ConsoleView, InteractionMode, SettingsView, TurnId, TurnRole, TurnStatus,
};

/// Turns successive view snapshots into the lines the console prints,
/// emitting only what changed since the previous snapshot.
#[derive(Debug, Default)]
pub struct ViewRenderer {
    mode: Option<InteractionMode>,
    notification_id: Option<u64>,
    log_pane_text: Option<String>,
    turns: HashMap<TurnId, (TurnStatus, String)>,
    settings: Option<(SettingsView, Vec<(String, String)>)>,
    settings_error: Option<String>,
}

impl ViewRenderer {
    pub fn render(&mut self, view: &ConsoleView, clock_label: &str) -> Vec<String> {
        let mut lines = Vec::new();

        if self.mode != Some(view.mode) {
            self.mode = Some(view.mode);
            lines.push(format!("== {} ==", view.mode.label()));
            // Force the pane for the new mode to print in full.
            self.log_pane_text = None;
            self.settings = None;
        }

        match view.mode {
            InteractionMode::Agent => self.render_logs(view, clock_label, &mut lines),
            InteractionMode::Chat => {}
            InteractionMode::Settings => self.render_settings(view, &mut lines),
        }
        self.render_turns(view, &mut lines);

        let notification_id = view.notification.as_ref().map(|notification| notification.id);
        if notification_id != self.notification_id {
            self.notification_id = notification_id;
            if let Some(notification) = &view.notification {
                lines.push(format!(
                    "[{}] {}",
                    notification.severity.as_str(),
                    notification.text
                ));
            }
        }
        lines
    }

    fn render_logs(&mut self, view: &ConsoleView, clock_label: &str, lines: &mut Vec<String>) {
        if self.log_pane_text.as_deref() == Some(view.log_pane_text.as_str()) {
            return;
        }
        self.log_pane_text = Some(view.log_pane_text.clone());
        lines.push(format!("-- agent logs ({clock_label}) --"));
        lines.extend(view.log_pane_text.lines().map(str::to_string));
    }

    fn render_settings(&mut self, view: &ConsoleView, lines: &mut Vec<String>) {
        let entries: Vec<(String, String)> = view
            .settings_entries
            .iter()
            .map(|entry| (entry.name.clone(), entry.display.clone()))
            .collect();
        let current = (view.settings_view, entries);
        if self.settings.as_ref() != Some(&current) && (view.settings_loaded || !current.1.is_empty())
        {
            let heading = match view.settings_view {
                SettingsView::ReadOnly => "-- API keys --",
                SettingsView::Editing => "-- API keys (editing: /set NAME=VALUE, /save, /cancel) --",
            };
            lines.push(heading.to_string());
            if current.1.is_empty() {
                lines.push("(no keys configured)".to_string());
            }
            for (name, display) in &current.1 {
                lines.push(format!("{name}: {display}"));
            }
            self.settings = Some(current);
        }

        if view.settings_error != self.settings_error {
            self.settings_error = view.settings_error.clone();
            if let Some(error) = &view.settings_error {
                lines.push(format!("settings error: {error}"));
            }
        }
    }

    fn render_turns(&mut self, view: &ConsoleView, lines: &mut Vec<String>) {
        if view.turns.is_empty() {
            self.turns.clear();
            return;
        }
        for turn in &view.turns {
            let seen = self.turns.get(&turn.id);
            if seen.is_some_and(|(status, content)| *status == turn.status && *content == turn.content)
            {
                continue;
            }
            let speaker = match turn.role {
                TurnRole::User => "you",
                TurnRole::Agent => "agent",
            };
            lines.push(format!("{speaker}> {}", turn.content));
            self.turns
                .insert(turn.id, (turn.status, turn.content.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use manus_console_core::{Command, ConsoleConfig, ConsoleController, Effect};
    use serde_json::json;

    use super::*;

    fn ticket(effects: &[Effect]) -> manus_console_core::RequestTicket {
        match effects.first() {
            Some(Effect::Issue(planned)) => planned.ticket,
            other => panic!("expected an issued request, got {other:?}"),
        }
    }

    #[test]
    fn prints_mode_logs_and_notifications_once() {
        let mut controller = ConsoleController::new(ConsoleConfig::default());
        let mut renderer = ViewRenderer::default();
        let boot = ticket(&controller.boot(0));

        let lines = renderer.render(&controller.view(), "10:00:00");
        assert_eq!(
            lines,
            vec![
                "== Agent Mode ==",
                "-- agent logs (10:00:00) --",
                "Loading agent logs...",
            ]
        );

        controller.complete(boot, Ok(json!({ "logs": ["one", "two"] })), 1);
        let lines = renderer.render(&controller.view(), "10:00:01");
        assert_eq!(lines, vec!["-- agent logs (10:00:01) --", "one", "two"]);
        assert!(renderer.render(&controller.view(), "10:00:02").is_empty());

        controller.handle(Command::ClearChat, 2);
        let lines = renderer.render(&controller.view(), "10:00:03");
        assert_eq!(lines, vec!["[success] Chat cleared"]);
    }

    #[test]
    fn pending_turn_prints_again_when_finalized() {
        let mut controller = ConsoleController::new(ConsoleConfig::default());
        let mut renderer = ViewRenderer::default();
        controller.boot(0);
        controller.handle(Command::Activate(InteractionMode::Chat), 1);
        let send = ticket(&controller.handle(Command::SendChat("hi".to_string()), 2));

        let lines = renderer.render(&controller.view(), "t");
        assert_eq!(lines, vec!["== Chat Mode ==", "you> hi", "agent> Thinking..."]);

        controller.complete(send, Ok(json!({ "output": "hello" })), 3);
        assert_eq!(renderer.render(&controller.view(), "t"), vec!["agent> hello"]);
    }

    #[test]
    fn settings_are_masked_in_read_only_view() {
        let mut controller = ConsoleController::new(ConsoleConfig::default());
        let mut renderer = ViewRenderer::default();
        controller.boot(0);
        let load = ticket(&controller.handle(Command::Activate(InteractionMode::Settings), 1));
        controller.complete(load, Ok(json!({ "A": "secret", "B": "" })), 2);

        let lines = renderer.render(&controller.view(), "t");
        assert_eq!(
            lines,
            vec!["== Settings ==", "-- API keys --", "A: ********", "B: Not set"]
        );
    }
}
