//! Attempt status and leveled diagnostic messages
//!
//! A [`Status`] is created once per update attempt and carries a
//! [`MessageGroup`]: three append-only, ordered message sequences. Partial
//! failures are reported by appending, never by overwriting, so the
//! resolution phase's diagnostics survive into the final report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome state of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Attempt has not run (or has not reached a terminal state yet)
    #[default]
    NotExecute,
    /// Remote reported success
    Success,
    /// Attempt failed
    Failed,
    /// Resolution phase hit its deadline
    Timeout,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::NotExecute => "not executed",
            State::Success => "success",
            State::Failed => "failed",
            State::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Severity of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// A single diagnostic entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Human-readable text
    pub text: String,
    /// When the entry was recorded
    pub at: DateTime<Utc>,
}

impl Message {
    fn now(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            at: Utc::now(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Leveled, ordered, append-only diagnostic log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageGroup {
    info: Vec<Message>,
    warn: Vec<Message>,
    error: Vec<Message>,
}

impl MessageGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_info(&mut self, text: impl Into<String>) {
        self.info.push(Message::now(text));
    }

    pub fn add_warn(&mut self, text: impl Into<String>) {
        self.warn.push(Message::now(text));
    }

    pub fn add_error(&mut self, text: impl Into<String>) {
        self.error.push(Message::now(text));
    }

    /// Append every sequence of `other` onto the matching sequence of `self`
    ///
    /// Entries keep their original timestamps and relative order; nothing is
    /// deduplicated.
    pub fn merge(&mut self, other: &MessageGroup) {
        self.info.extend(other.info.iter().cloned());
        self.warn.extend(other.warn.iter().cloned());
        self.error.extend(other.error.iter().cloned());
    }

    pub fn info(&self) -> &[Message] {
        &self.info
    }

    pub fn warn(&self) -> &[Message] {
        &self.warn
    }

    pub fn error(&self) -> &[Message] {
        &self.error
    }

    /// Messages of one level
    pub fn at_level(&self, level: Level) -> &[Message] {
        match level {
            Level::Info => &self.info,
            Level::Warn => &self.warn,
            Level::Error => &self.error,
        }
    }

    /// Total number of entries across all levels
    pub fn len(&self) -> usize {
        self.info.len() + self.warn.len() + self.error.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Structured result of one update attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Service (provider) name that produced the status
    pub name: String,
    /// Current state
    pub state: State,
    /// Diagnostic timeline
    pub messages: MessageGroup,
}

impl Status {
    /// Create a fresh, not-yet-executed status
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: State::NotExecute,
            messages: MessageGroup::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == State::Success
    }

    pub fn add_info(&mut self, text: impl Into<String>) {
        self.messages.add_info(text);
    }

    pub fn add_warn(&mut self, text: impl Into<String>) {
        self.messages.add_warn(text);
    }

    pub fn add_error(&mut self, text: impl Into<String>) {
        self.messages.add_error(text);
    }

    /// Merge another status's messages into this one without touching `state`
    pub fn merge_messages(&mut self, other: &Status) {
        self.messages.merge(&other.messages);
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.state)?;
        for m in self.messages.info() {
            write!(f, "\n  [info] {m}")?;
        }
        for m in self.messages.warn() {
            write!(f, "\n  [warn] {m}")?;
        }
        for m in self.messages.error() {
            write!(f, "\n  [error] {m}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn new_status_is_not_executed_and_empty() {
        let status = Status::new("dnspod");
        assert_eq!(status.state, State::NotExecute);
        assert!(status.messages.is_empty());
        assert!(!status.is_success());
    }

    #[test]
    fn merge_appends_each_level_in_order() {
        let mut parent = MessageGroup::new();
        parent.add_info("p-info");
        parent.add_error("p-error");

        let mut child = MessageGroup::new();
        child.add_info("c-info-1");
        child.add_info("c-info-2");
        child.add_warn("c-warn");
        child.add_error("c-error-1");
        child.add_error("c-error-2");

        parent.merge(&child);

        assert_eq!(texts(parent.info()), ["p-info", "c-info-1", "c-info-2"]);
        assert_eq!(texts(parent.warn()), ["c-warn"]);
        assert_eq!(texts(parent.error()), ["p-error", "c-error-1", "c-error-2"]);
    }

    #[test]
    fn merge_never_decreases_counts_and_keeps_duplicates() {
        let mut parent = MessageGroup::new();
        parent.add_warn("same");

        let mut child = MessageGroup::new();
        child.add_warn("same");

        for _ in 0..3 {
            let before = (parent.info().len(), parent.warn().len(), parent.error().len());
            parent.merge(&child);
            assert!(parent.info().len() >= before.0);
            assert_eq!(parent.warn().len(), before.1 + 1);
            assert!(parent.error().len() >= before.2);
        }
        assert_eq!(texts(parent.warn()), ["same"; 4]);
        // the child is left untouched
        assert_eq!(child.len(), 1);
    }

    #[test]
    fn merge_preserves_child_timestamps() {
        let mut child = MessageGroup::new();
        child.add_info("resolved");
        let stamp = child.info()[0].at;

        let mut parent = MessageGroup::new();
        parent.merge(&child);
        assert_eq!(parent.info()[0].at, stamp);
    }

    #[test]
    fn status_merge_leaves_state_alone() {
        let mut parent = Status::new("dnspod");
        parent.state = State::Failed;

        let mut child = Status::new("dnspod");
        child.state = State::Success;
        child.add_info("child");

        parent.merge_messages(&child);
        assert_eq!(parent.state, State::Failed);
        assert_eq!(texts(parent.messages.at_level(Level::Info)), ["child"]);
    }

    #[test]
    fn display_lists_messages_by_level() {
        let mut status = Status::new("dnspod");
        status.state = State::Failed;
        status.add_error("boom");
        status.add_info("hello");

        let rendered = status.to_string();
        assert!(rendered.starts_with("dnspod: failed"));
        assert!(rendered.contains("[info] hello"));
        assert!(rendered.contains("[error] boom"));
    }

    #[test]
    fn status_serializes_to_json() {
        let mut status = Status::new("dnspod");
        status.state = State::Timeout;
        status.add_error("resolution timeout");

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "timeout");
        assert_eq!(json["messages"]["error"][0]["text"], "resolution timeout");
    }
}
