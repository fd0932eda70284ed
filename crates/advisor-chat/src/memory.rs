//! Per-request conversation memory rebuilt from stored turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use advisor_core::config::MemorySettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into(), at: Utc::now() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into(), at: Utc::now() }
    }
}

/// `max_turns = 0` keeps everything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryPolicy {
    pub max_turns: usize,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self { max_turns: 20 }
    }
}

impl From<&MemorySettings> for MemoryPolicy {
    fn from(s: &MemorySettings) -> Self {
        Self { max_turns: s.max_turns }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryState {
    turns: Vec<ConversationTurn>,
}

impl MemoryState {
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }
}

/// Order turns chronologically (stable for equal timestamps) and keep the
/// most recent window. A truncated window never opens on an assistant turn.
pub fn rehydrate(turns: &[ConversationTurn], policy: MemoryPolicy) -> MemoryState {
    let mut ordered = turns.to_vec();
    ordered.sort_by_key(|t| t.at);

    if policy.max_turns > 0 && ordered.len() > policy.max_turns {
        let mut start = ordered.len() - policy.max_turns;
        while start < ordered.len() && ordered[start].role == Role::Assistant {
            start += 1;
        }
        ordered.drain(..start);
    }
    MemoryState { turns: ordered }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(role: Role, text: &str, secs: i64) -> ConversationTurn {
        let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default();
        ConversationTurn { role, text: text.to_string(), at: base + Duration::seconds(secs) }
    }

    #[test]
    fn preserves_order_and_roles() {
        let turns = vec![
            at(Role::User, "what is term life?", 0),
            at(Role::Assistant, "coverage for a fixed period", 1),
            at(Role::User, "and whole life?", 2),
        ];
        let memory = rehydrate(&turns, MemoryPolicy::default());
        let got: Vec<(Role, &str)> =
            memory.turns().iter().map(|t| (t.role, t.text.as_str())).collect();
        assert_eq!(
            got,
            vec![
                (Role::User, "what is term life?"),
                (Role::Assistant, "coverage for a fixed period"),
                (Role::User, "and whole life?"),
            ]
        );
    }

    #[test]
    fn sorts_by_timestamp_stably() {
        let turns = vec![
            at(Role::User, "second", 5),
            at(Role::User, "first", 1),
            at(Role::Assistant, "tie-a", 5),
        ];
        let memory = rehydrate(&turns, MemoryPolicy { max_turns: 0 });
        let texts: Vec<&str> = memory.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "tie-a"]);
    }

    #[test]
    fn truncation_keeps_recent_window_starting_on_user() {
        let turns: Vec<ConversationTurn> = (0..7)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                at(role, &format!("t{i}"), i)
            })
            .collect();
        // last 4 would be t3(assistant) t4 t5 t6; the assistant opener is dropped
        let memory = rehydrate(&turns, MemoryPolicy { max_turns: 4 });
        let texts: Vec<&str> = memory.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["t4", "t5", "t6"]);
        assert_eq!(memory.turns()[0].role, Role::User);
    }

    #[test]
    fn zero_means_unbounded() {
        let turns: Vec<ConversationTurn> = (0..50).map(|i| at(Role::User, "q", i)).collect();
        assert_eq!(rehydrate(&turns, MemoryPolicy { max_turns: 0 }).len(), 50);
    }

    #[test]
    fn empty_history_is_empty_memory() {
        assert!(rehydrate(&[], MemoryPolicy::default()).is_empty());
    }
}
