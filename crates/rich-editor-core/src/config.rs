use std::time::Duration;

use regex::Regex;

use crate::autoformat::{AutoformatRule, default_rules};
use crate::error::ConfigError;
use crate::mention::MentionOption;

const DEFAULT_MAX_NORMALIZE_ITERATIONS: usize = 100;
const DEFAULT_MENTION_SEARCH_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub max_normalize_iterations: usize,
    pub slash_trigger: char,
    pub mention_trigger: char,
    /// Pattern the character before a trigger must match (empty at block start).
    pub trigger_previous_char: String,
    pub autoformat_rules: Vec<AutoformatRule>,
    pub autoformat_trigger: char,
    pub mention_options: Vec<MentionOption>,
    pub mention_search_debounce: Duration,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_normalize_iterations: DEFAULT_MAX_NORMALIZE_ITERATIONS,
            slash_trigger: '/',
            mention_trigger: '@',
            trigger_previous_char: r"^\s?$".to_string(),
            autoformat_rules: default_rules(),
            autoformat_trigger: ' ',
            mention_options: Vec::new(),
            mention_search_debounce: DEFAULT_MENTION_SEARCH_DEBOUNCE,
        }
    }
}

impl EditorConfig {
    /// Replaces zero values with defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = DEFAULT_MAX_NORMALIZE_ITERATIONS;
        }
        if self.mention_search_debounce.is_zero() {
            self.mention_search_debounce = DEFAULT_MENTION_SEARCH_DEBOUNCE;
        }
        if self.trigger_previous_char.is_empty() {
            self.trigger_previous_char = r"^\s?$".to_string();
        }
        self
    }

    pub fn slash_trigger(mut self, trigger: char) -> Self {
        self.slash_trigger = trigger;
        self
    }

    pub fn mention_trigger(mut self, trigger: char) -> Self {
        self.mention_trigger = trigger;
        self
    }

    pub fn trigger_previous_char(mut self, pattern: impl Into<String>) -> Self {
        self.trigger_previous_char = pattern.into();
        self
    }

    pub fn autoformat_rules(mut self, rules: Vec<AutoformatRule>) -> Self {
        self.autoformat_rules = rules;
        self
    }

    pub fn autoformat_trigger(mut self, trigger: char) -> Self {
        self.autoformat_trigger = trigger;
        self
    }

    pub fn mention_options(mut self, options: Vec<MentionOption>) -> Self {
        self.mention_options = options;
        self
    }

    pub fn mention_search_debounce(mut self, delay: Duration) -> Self {
        self.mention_search_debounce = delay;
        self
    }

    pub fn previous_char_pattern(&self) -> Result<Regex, ConfigError> {
        Ok(Regex::new(&self.trigger_previous_char)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for trigger in [self.slash_trigger, self.mention_trigger] {
            if trigger.is_alphanumeric() || trigger == '_' || trigger.is_whitespace() {
                return Err(ConfigError::Trigger(trigger));
            }
        }
        if self.slash_trigger == self.mention_trigger {
            return Err(ConfigError::DuplicateTrigger(self.slash_trigger));
        }
        self.previous_char_pattern()?;
        for rule in &self.autoformat_rules {
            rule.compile()?;
        }
        Ok(())
    }
}
