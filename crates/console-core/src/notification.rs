use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPhase {
    Visible,
    FadingOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub text: String,
    pub severity: Severity,
    pub created_at_ms: u64,
    pub phase: NotificationPhase,
}

/// Holds at most one transient status message.
///
/// A new notification replaces the displayed one in the same call, so the
/// old one is gone before the new one can render. Each notification stays
/// `Visible` for `visible_ms`, then `FadingOut` for `fade_ms`, then is
/// removed by [`NotificationQueue::sweep`].
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    current: Option<Notification>,
    next_id: u64,
    visible_ms: u64,
    fade_ms: u64,
}

impl NotificationQueue {
    #[must_use]
    pub fn new(visible_ms: u64, fade_ms: u64) -> Self {
        Self {
            current: None,
            next_id: 1,
            visible_ms,
            fade_ms,
        }
    }

    pub fn notify(&mut self, text: impl Into<String>, severity: Severity, now_ms: u64) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        let notification = Notification {
            id,
            text: text.into(),
            severity,
            created_at_ms: now_ms,
            phase: NotificationPhase::Visible,
        };
        tracing::debug!(
            notification_id = id,
            severity = severity.as_str(),
            text = notification.text.as_str(),
            "console notification"
        );
        self.current = Some(notification);
        id
    }

    /// Advances the current notification through its fade and removal
    /// deadlines. Returns true when anything changed.
    pub fn sweep(&mut self, now_ms: u64) -> bool {
        let Some(notification) = self.current.as_mut() else {
            return false;
        };
        let fade_at = notification.created_at_ms.saturating_add(self.visible_ms);
        let remove_at = fade_at.saturating_add(self.fade_ms);
        if now_ms >= remove_at {
            self.current = None;
            return true;
        }
        if now_ms >= fade_at && notification.phase == NotificationPhase::Visible {
            notification.phase = NotificationPhase::FadingOut;
            return true;
        }
        false
    }

    /// The next instant at which [`sweep`](Self::sweep) would change state.
    #[must_use]
    pub fn next_deadline_ms(&self) -> Option<u64> {
        let notification = self.current.as_ref()?;
        let fade_at = notification.created_at_ms.saturating_add(self.visible_ms);
        match notification.phase {
            NotificationPhase::Visible => Some(fade_at),
            NotificationPhase::FadingOut => Some(fade_at.saturating_add(self.fade_ms)),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) -> bool {
        self.current.take().is_some()
    }
}
