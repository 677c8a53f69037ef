use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    #[default]
    Agent,
    Chat,
    Settings,
}

impl InteractionMode {
    pub const ALL: [Self; 3] = [Self::Agent, Self::Chat, Self::Settings];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Chat => "chat",
            Self::Settings => "settings",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Agent => "Agent Mode",
            Self::Chat => "Chat Mode",
            Self::Settings => "Settings",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "agent" => Some(Self::Agent),
            "chat" => Some(Self::Chat),
            "settings" => Some(Self::Settings),
            _ => None,
        }
    }
}

/// One accepted mode change: the exit hook of `exited` runs before the
/// enter hook of `entered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub exited: InteractionMode,
    pub entered: InteractionMode,
}

#[derive(Debug, Clone, Default)]
pub struct ModeStateMachine {
    active: InteractionMode,
    transitions: u64,
}

impl ModeStateMachine {
    #[must_use]
    pub fn active(&self) -> InteractionMode {
        self.active
    }

    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Switches to `mode`. Re-selecting the active mode returns `None` and
    /// runs no hooks.
    pub fn activate(&mut self, mode: InteractionMode) -> Option<ModeTransition> {
        if mode == self.active {
            return None;
        }
        let transition = ModeTransition {
            exited: self.active,
            entered: mode,
        };
        self.active = mode;
        self.transitions = self.transitions.saturating_add(1);
        tracing::debug!(
            from = transition.exited.as_str(),
            to = transition.entered.as_str(),
            "console mode transition"
        );
        Some(transition)
    }
}
