use std::fmt;

use serde::Serialize;

use crate::api::ChatResponse;

pub const PENDING_PLACEHOLDER: &str = "Thinking...";
pub const EMPTY_OUTPUT_TEXT: &str = "No response received";

/// Turn identifier. Allocated from a counter that survives `clear()`, so an
/// id is never handed out twice in one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TurnId(u64);

impl TurnId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Final,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub id: TurnId,
    pub role: TurnRole,
    pub content: String,
    pub status: TurnStatus,
    /// Set when a Pending agent turn was finalized from a failed exchange.
    pub failed: bool,
}

/// An accepted send: the trimmed input to post and the agent turn that
/// will receive the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExchange {
    pub agent_turn: TurnId,
    pub input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatResolution {
    /// False when the turn was cleared before the answer arrived.
    pub turn_updated: bool,
    pub agent_reported_error: bool,
}

#[derive(Debug, Clone)]
pub struct ChatTranscript {
    turns: Vec<ChatTurn>,
    next_id: u64,
    pending: Option<TurnId>,
}

impl Default for ChatTranscript {
    fn default() -> Self {
        Self {
            turns: Vec::new(),
            next_id: 1,
            pending: None,
        }
    }
}

impl ChatTranscript {
    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn pending_turn(&self) -> Option<TurnId> {
        self.pending
    }

    /// Appends the user turn and a Pending agent turn. Blank input or an
    /// exchange already in flight leaves the transcript untouched.
    pub fn begin_exchange(&mut self, text: &str) -> Option<PendingExchange> {
        let input = text.trim();
        if input.is_empty() || self.pending.is_some() {
            return None;
        }

        self.push_turn(TurnRole::User, input.to_string(), TurnStatus::Final);
        let agent_turn = self.push_turn(
            TurnRole::Agent,
            PENDING_PLACEHOLDER.to_string(),
            TurnStatus::Pending,
        );
        self.pending = Some(agent_turn);
        Some(PendingExchange {
            agent_turn,
            input: input.to_string(),
        })
    }

    pub fn resolve_success(&mut self, turn: TurnId, response: ChatResponse) -> ChatResolution {
        let content = response
            .output
            .filter(|output| !output.trim().is_empty())
            .unwrap_or_else(|| EMPTY_OUTPUT_TEXT.to_string());
        let turn_updated = self.finalize(turn, content, false);
        ChatResolution {
            turn_updated,
            agent_reported_error: response.error,
        }
    }

    /// Finalizes the pending turn with `Error: <message>`.
    pub fn resolve_failure(&mut self, turn: TurnId, message: &str) -> ChatResolution {
        let turn_updated = self.finalize(turn, format!("Error: {message}"), true);
        ChatResolution {
            turn_updated,
            agent_reported_error: false,
        }
    }

    /// Drops every turn. An exchange still in flight keeps the send guard
    /// until it resolves; its answer then lands nowhere.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    fn finalize(&mut self, turn: TurnId, content: String, failed: bool) -> bool {
        if self.pending == Some(turn) {
            self.pending = None;
        }
        let Some(existing) = self
            .turns
            .iter_mut()
            .find(|existing| existing.id == turn && existing.status == TurnStatus::Pending)
        else {
            return false;
        };
        existing.content = content;
        existing.status = TurnStatus::Final;
        existing.failed = failed;
        true
    }

    fn push_turn(&mut self, role: TurnRole, content: String, status: TurnStatus) -> TurnId {
        let id = TurnId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.turns.push(ChatTurn {
            id,
            role,
            content,
            status,
            failed: false,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(output: &str) -> ChatResponse {
        ChatResponse {
            output: Some(output.to_string()),
            error: false,
        }
    }

    fn pending_count(transcript: &ChatTranscript) -> usize {
        transcript
            .turns()
            .iter()
            .filter(|turn| turn.status == TurnStatus::Pending)
            .count()
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut transcript = ChatTranscript::default();
        assert_eq!(transcript.begin_exchange(""), None);
        assert_eq!(transcript.begin_exchange("   \n\t"), None);
        assert!(transcript.turns().is_empty());
    }

    #[test]
    fn send_while_pending_is_ignored() {
        let mut transcript = ChatTranscript::default();
        let exchange = transcript.begin_exchange("  hello  ").expect("accepted");
        assert_eq!(exchange.input, "hello");
        assert_eq!(transcript.begin_exchange("hi"), None);
        assert_eq!(transcript.turns().len(), 2);
        assert_eq!(pending_count(&transcript), 1);

        let turns = transcript.turns();
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(turns[1].role, TurnRole::Agent);
        assert_eq!(turns[1].content, PENDING_PLACEHOLDER);
    }

    #[test]
    fn success_finalizes_pending_turn_in_place() {
        let mut transcript = ChatTranscript::default();
        let exchange = transcript.begin_exchange("hello").expect("accepted");
        let resolution = transcript.resolve_success(exchange.agent_turn, ok("ok"));

        assert!(resolution.turn_updated);
        assert!(!transcript.is_pending());
        let agent = &transcript.turns()[1];
        assert_eq!(agent.id, exchange.agent_turn);
        assert_eq!(agent.status, TurnStatus::Final);
        assert_eq!(agent.content, "ok");
        assert!(!agent.failed);
    }

    #[test]
    fn empty_output_renders_placeholder_and_error_flag_surfaces() {
        let mut transcript = ChatTranscript::default();
        let exchange = transcript.begin_exchange("hello").expect("accepted");
        let resolution = transcript.resolve_success(
            exchange.agent_turn,
            ChatResponse {
                output: None,
                error: true,
            },
        );
        assert!(resolution.agent_reported_error);
        assert_eq!(transcript.turns()[1].content, EMPTY_OUTPUT_TEXT);
    }

    #[test]
    fn failure_renders_error_turn_and_releases_guard() {
        let mut transcript = ChatTranscript::default();
        let exchange = transcript.begin_exchange("hello").expect("accepted");
        transcript.resolve_failure(
            exchange.agent_turn,
            "Request timed out. The server may be overloaded.",
        );

        let agent = &transcript.turns()[1];
        assert!(agent.failed);
        assert_eq!(agent.status, TurnStatus::Final);
        assert!(agent.content.contains("timed out"));
        assert!(transcript.begin_exchange("again").is_some());
    }

    #[test]
    fn clear_while_pending_holds_guard_until_resolution() {
        let mut transcript = ChatTranscript::default();
        let exchange = transcript.begin_exchange("hello").expect("accepted");
        transcript.clear();

        assert!(transcript.turns().is_empty());
        assert!(transcript.is_pending());
        assert_eq!(transcript.begin_exchange("next"), None);

        let resolution = transcript.resolve_success(exchange.agent_turn, ok("late"));
        assert!(!resolution.turn_updated);
        assert!(transcript.turns().is_empty());
        assert!(!transcript.is_pending());
    }

    #[test]
    fn turn_ids_are_never_reused_after_clear() {
        let mut transcript = ChatTranscript::default();
        let first = transcript.begin_exchange("one").expect("accepted");
        transcript.resolve_success(first.agent_turn, ok("1"));
        transcript.clear();
        let second = transcript.begin_exchange("two").expect("accepted");

        assert!(second.agent_turn > first.agent_turn);
        assert_eq!(transcript.turns()[0].id.to_string(), "turn-3");
    }
}
