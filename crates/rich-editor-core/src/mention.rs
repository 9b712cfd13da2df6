use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::Editor;
use crate::menu::MenuItem;

pub const MENTION_EMPTY_TEXT: &str = "No results";

/// A mention candidate. The inserted mention stores `text` as its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MentionOption {
    pub key: String,
    pub text: String,
}

impl MentionOption {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

impl MenuItem for MentionOption {
    fn label(&self) -> &str {
        &self.text
    }

    fn matches(&self, query: &str) -> bool {
        query.is_empty() || self.text.to_lowercase().contains(&query.to_lowercase())
    }

    fn apply(&self, editor: &mut Editor) {
        editor.insert_mention(self);
    }
}

/// Holds the latest value until it has been quiet for `delay`.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the wait.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Takes the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|(_, deadline)| now >= *deadline);
        if !ready {
            return None;
        }
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_on_text_case_insensitively() {
        let option = MentionOption::new("1", "Alice Zhang");
        assert!(option.matches(""));
        assert!(option.matches("ZHA"));
        assert!(!option.matches("bob"));
    }

    #[test]
    fn only_the_last_value_fires_after_the_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(200));
        debouncer.schedule("a", start);
        debouncer.schedule("al", start + Duration::from_millis(100));
        assert_eq!(debouncer.poll(start + Duration::from_millis(250)), None);
        assert_eq!(debouncer.poll(start + Duration::from_millis(300)), Some("al"));
        assert_eq!(debouncer.poll(start + Duration::from_millis(900)), None);
    }
}
