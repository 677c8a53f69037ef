use crate::controller::Command;
use crate::mode::InteractionMode;

/// A key press as delivered by the surface, reduced to what shortcuts read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord<'a> {
    pub key: &'a str,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

impl<'a> KeyChord<'a> {
    #[must_use]
    pub const fn plain(key: &'a str) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            shift: false,
        }
    }

    #[must_use]
    pub const fn ctrl(key: &'a str) -> Self {
        Self {
            key,
            ctrl: true,
            meta: false,
            shift: false,
        }
    }
}

/// Maps a document-level key press to a console command. Ctrl and Cmd are
/// interchangeable; refresh only applies in Agent mode.
#[must_use]
pub fn global_shortcut(chord: KeyChord<'_>, active: InteractionMode) -> Option<Command> {
    if !(chord.ctrl || chord.meta) {
        return None;
    }
    match chord.key {
        "1" => Some(Command::Activate(InteractionMode::Agent)),
        "2" => Some(Command::Activate(InteractionMode::Chat)),
        "3" => Some(Command::Activate(InteractionMode::Settings)),
        "r" | "R" if active == InteractionMode::Agent => Some(Command::RefreshLogs),
        _ => None,
    }
}

/// Enter submits the composer; Shift+Enter inserts a newline.
#[must_use]
pub fn composer_submits(chord: KeyChord<'_>) -> bool {
    chord.key == "Enter" && !chord.shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_shortcuts_switch_modes() {
        assert_eq!(
            global_shortcut(KeyChord::ctrl("2"), InteractionMode::Agent),
            Some(Command::Activate(InteractionMode::Chat))
        );
        let meta = KeyChord {
            meta: true,
            ..KeyChord::plain("1")
        };
        assert_eq!(
            global_shortcut(meta, InteractionMode::Chat),
            Some(Command::Activate(InteractionMode::Agent))
        );
        assert_eq!(
            global_shortcut(KeyChord::plain("1"), InteractionMode::Chat),
            None
        );
    }

    #[test]
    fn refresh_only_in_agent_mode() {
        assert_eq!(
            global_shortcut(KeyChord::ctrl("r"), InteractionMode::Agent),
            Some(Command::RefreshLogs)
        );
        assert_eq!(
            global_shortcut(KeyChord::ctrl("r"), InteractionMode::Chat),
            None
        );
    }

    #[test]
    fn enter_without_shift_submits() {
        assert!(composer_submits(KeyChord::plain("Enter")));
        let shifted = KeyChord {
            shift: true,
            ..KeyChord::plain("Enter")
        };
        assert!(!composer_submits(shifted));
        assert!(!composer_submits(KeyChord::plain("a")));
    }
}
