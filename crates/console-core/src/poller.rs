use crate::outcome::RequestFailure;

pub const LOGS_LOADING_TEXT: &str = "Loading agent logs...";
pub const LOGS_EMPTY_TEXT: &str = "No logs available";
pub const LOGS_ERROR_HINT: &str =
    "Please check if the backend server is running and the API endpoint is available.";

/// Log lines as last returned by the backend; replaced wholesale.
pub type LogSnapshot = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSkipReason {
    InFlight,
    TabHidden,
    NotAgentMode,
}

impl PollSkipReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InFlight => "in_flight",
            Self::TabHidden => "tab_hidden",
            Self::NotAgentMode => "not_agent_mode",
        }
    }
}

/// What the caller must do after a poller transition. `Issue` means the
/// in-flight guard is now held and the caller owes a [`PollerState::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    Issue,
    Skip(PollSkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerState {
    interval_ms: u64,
    tab_visible: bool,
    agent_active: bool,
    in_flight: bool,
    snapshot: Option<LogSnapshot>,
    error: Option<RequestFailure>,
    last_refreshed_at_ms: Option<u64>,
}

impl PollerState {
    #[must_use]
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            tab_visible: true,
            agent_active: false,
            in_flight: false,
            snapshot: None,
            error: None,
            last_refreshed_at_ms: None,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.tab_visible && self.agent_active
    }

    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    #[must_use]
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    #[must_use]
    pub fn tab_visible(&self) -> bool {
        self.tab_visible
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&[String]> {
        self.snapshot.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&RequestFailure> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn last_refreshed_at_ms(&self) -> Option<u64> {
        self.last_refreshed_at_ms
    }

    pub fn on_tick(&mut self) -> PollDecision {
        if !self.tab_visible {
            return PollDecision::Skip(PollSkipReason::TabHidden);
        }
        if !self.agent_active {
            return PollDecision::Skip(PollSkipReason::NotAgentMode);
        }
        self.begin()
    }

    pub fn on_visibility_change(&mut self, visible: bool) -> PollDecision {
        self.tab_visible = visible;
        if !visible {
            return PollDecision::Skip(PollSkipReason::TabHidden);
        }
        if !self.agent_active {
            return PollDecision::Skip(PollSkipReason::NotAgentMode);
        }
        self.begin()
    }

    /// Entering Agent mode refreshes immediately regardless of visibility;
    /// leaving it disables the periodic tick.
    pub fn on_mode_change(&mut self, agent_active: bool) -> PollDecision {
        self.agent_active = agent_active;
        if !agent_active {
            return PollDecision::Skip(PollSkipReason::NotAgentMode);
        }
        self.begin()
    }

    /// Operator-requested refresh; only the in-flight guard applies.
    pub fn request_manual(&mut self) -> PollDecision {
        self.begin()
    }

    /// Refresh scheduled after a start/stop action; same gating as manual.
    pub fn request_follow_up(&mut self) -> PollDecision {
        self.begin()
    }

    fn begin(&mut self) -> PollDecision {
        if self.in_flight {
            return PollDecision::Skip(PollSkipReason::InFlight);
        }
        self.in_flight = true;
        PollDecision::Issue
    }

    /// Releases the in-flight guard. Success replaces the snapshot; failure
    /// keeps it and records the error for inline display.
    pub fn complete(&mut self, now_ms: u64, result: Result<LogSnapshot, RequestFailure>) {
        self.in_flight = false;
        match result {
            Ok(lines) => {
                self.snapshot = Some(lines);
                self.error = None;
                self.last_refreshed_at_ms = Some(now_ms);
            }
            Err(failure) => {
                self.error = Some(failure);
            }
        }
    }

    #[must_use]
    pub fn log_pane_text(&self) -> String {
        if let Some(error) = &self.error {
            return format!("Error loading logs: {error}\n\n{LOGS_ERROR_HINT}");
        }
        match &self.snapshot {
            None => LOGS_LOADING_TEXT.to_string(),
            Some(lines) if lines.is_empty() => LOGS_EMPTY_TEXT.to_string(),
            Some(lines) => lines.join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_poller() -> PollerState {
        let mut poller = PollerState::new(30_000);
        assert_eq!(poller.on_mode_change(true), PollDecision::Issue);
        poller.complete(0, Ok(vec!["booted".to_string()]));
        poller
    }

    #[test]
    fn back_to_back_manual_refreshes_issue_once() {
        let mut poller = agent_poller();
        assert_eq!(poller.request_manual(), PollDecision::Issue);
        assert_eq!(
            poller.request_manual(),
            PollDecision::Skip(PollSkipReason::InFlight)
        );
        assert!(poller.in_flight());
    }

    #[test]
    fn hidden_tab_disables_ticks_until_visible() {
        let mut poller = agent_poller();
        assert_eq!(
            poller.on_visibility_change(false),
            PollDecision::Skip(PollSkipReason::TabHidden)
        );
        assert!(!poller.enabled());
        for _ in 0..3 {
            assert_eq!(
                poller.on_tick(),
                PollDecision::Skip(PollSkipReason::TabHidden)
            );
        }
        assert!(!poller.in_flight());

        assert_eq!(poller.on_visibility_change(true), PollDecision::Issue);
        assert!(poller.enabled());
    }

    #[test]
    fn visibility_outside_agent_mode_does_not_refresh() {
        let mut poller = agent_poller();
        poller.on_mode_change(false);
        poller.on_visibility_change(false);
        assert_eq!(
            poller.on_visibility_change(true),
            PollDecision::Skip(PollSkipReason::NotAgentMode)
        );
        assert_eq!(
            poller.on_tick(),
            PollDecision::Skip(PollSkipReason::NotAgentMode)
        );
    }

    #[test]
    fn manual_refresh_ignores_mode_and_visibility() {
        let mut poller = agent_poller();
        poller.on_mode_change(false);
        poller.on_visibility_change(false);
        assert_eq!(poller.request_manual(), PollDecision::Issue);
        poller.complete(5, Ok(Vec::new()));
        assert_eq!(poller.request_follow_up(), PollDecision::Issue);
    }

    #[test]
    fn failure_keeps_snapshot_and_renders_inline_error() {
        let mut poller = agent_poller();
        assert_eq!(poller.request_manual(), PollDecision::Issue);
        poller.complete(10, Err(RequestFailure::Timeout));

        assert!(!poller.in_flight());
        assert_eq!(poller.snapshot(), Some(&["booted".to_string()][..]));
        assert_eq!(poller.last_refreshed_at_ms(), Some(0));
        let text = poller.log_pane_text();
        assert!(text.starts_with("Error loading logs: Request timed out"));
        assert!(text.ends_with(LOGS_ERROR_HINT));

        assert_eq!(poller.request_manual(), PollDecision::Issue);
        poller.complete(20, Ok(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(poller.log_pane_text(), "a\nb");
        assert_eq!(poller.last_refreshed_at_ms(), Some(20));
    }

    #[test]
    fn pane_text_before_load_and_when_empty() {
        let mut poller = PollerState::new(30_000);
        assert_eq!(poller.log_pane_text(), LOGS_LOADING_TEXT);
        poller.on_mode_change(true);
        poller.complete(1, Ok(Vec::new()));
        assert_eq!(poller.log_pane_text(), LOGS_EMPTY_TEXT);
    }
}
