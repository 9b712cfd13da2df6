//! Markdown-style block shortcuts: typing `# ` at the start of a block turns
//! it into a heading, `- ` into a bulleted list, and so on.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::Editor;
use crate::error::ConfigError;
use crate::inline;
use crate::location::{Location, Range, split_parent};
use crate::node::ElementKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoformatAction {
    Block(ElementKind),
    List(ElementKind),
    /// Numbered list starting at the number that was typed.
    NumberedList,
    Todo { checked: bool },
}

/// What the block text before the cursor must be when the trigger is typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleMatch {
    Literal(String),
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoformatRule {
    pub matches: Vec<RuleMatch>,
    pub action: AutoformatAction,
}

impl AutoformatRule {
    pub fn literal(text: impl Into<String>, action: AutoformatAction) -> Self {
        Self::literals([text], action)
    }

    pub fn literals<I, S>(texts: I, action: AutoformatAction) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            matches: texts
                .into_iter()
                .map(|text| RuleMatch::Literal(text.into()))
                .collect(),
            action,
        }
    }

    pub fn pattern(pattern: impl Into<String>, action: AutoformatAction) -> Self {
        Self {
            matches: vec![RuleMatch::Pattern(pattern.into())],
            action,
        }
    }

    pub(crate) fn compile(&self) -> Result<CompiledRule, ConfigError> {
        let mut literals = Vec::new();
        let mut patterns = Vec::new();
        for m in &self.matches {
            match m {
                RuleMatch::Literal(text) => literals.push(text.clone()),
                RuleMatch::Pattern(pattern) => patterns.push(Regex::new(pattern)?),
            }
        }
        Ok(CompiledRule {
            literals,
            patterns,
            action: self.action,
        })
    }
}

pub fn default_rules() -> Vec<AutoformatRule> {
    use AutoformatAction::*;

    vec![
        AutoformatRule::literal("#", Block(ElementKind::H1)),
        AutoformatRule::literal("##", Block(ElementKind::H2)),
        AutoformatRule::literal("###", Block(ElementKind::H3)),
        AutoformatRule::literal(">", Block(ElementKind::Blockquote)),
        AutoformatRule::literals(["*", "-"], List(ElementKind::BulletedList)),
        AutoformatRule {
            matches: vec![
                RuleMatch::Pattern(r"^\d+\.$".into()),
                RuleMatch::Pattern(r"^\d+\)$".into()),
            ],
            action: NumberedList,
        },
        AutoformatRule::literal("[]", Todo { checked: false }),
        AutoformatRule::literal("[x]", Todo { checked: true }),
    ]
}

pub(crate) struct CompiledRule {
    literals: Vec<String>,
    patterns: Vec<Regex>,
    action: AutoformatAction,
}

impl CompiledRule {
    fn matches(&self, prefix: &str) -> bool {
        self.literals.iter().any(|l| l == prefix) || self.patterns.iter().any(|p| p.is_match(prefix))
    }
}

pub struct Autoformat {
    rules: Vec<CompiledRule>,
    trigger: char,
}

impl Autoformat {
    pub fn new(rules: &[AutoformatRule], trigger: char) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: rules.iter().map(AutoformatRule::compile).collect::<Result<_, _>>()?,
            trigger,
        })
    }

    pub fn trigger(&self) -> char {
        self.trigger
    }

    /// Runs the first rule matching the text between the block start and the
    /// cursor. Called in place of inserting the trigger character; returns
    /// whether a rule consumed it.
    pub fn apply(&self, editor: &mut Editor) -> bool {
        let selection = editor.selection();
        if !selection.is_collapsed() {
            return false;
        }
        let cursor = selection.focus.clone();
        let doc = editor.doc();
        let Some(block_path) = doc.text_block_path(&cursor.path) else {
            return false;
        };
        let Some(block) = doc.element(&block_path) else {
            return false;
        };
        if block.kind == ElementKind::CodeBlock {
            return false;
        }
        let g = inline::offset_in_block(block, &cursor.path[block_path.len()..], cursor.offset);
        let (prefix, run_start) = inline::text_before(block, g);
        if run_start != 0 || prefix.is_empty() {
            return false;
        }
        let list_kind = split_parent(&block_path)
            .and_then(|(parent, _)| doc.element(parent))
            .map(|parent| parent.kind)
            .filter(|kind| kind.is_list());

        let Some(rule) = self.rules.iter().find(|rule| {
            rule.matches(&prefix) && !already_applied(rule.action, block.kind, list_kind)
        }) else {
            return false;
        };
        let Some(block_start) = doc.first_point_in(&block_path) else {
            return false;
        };
        let action = rule.action;
        debug!(prefix = %prefix, ?action, "autoformat");

        editor.without_normalizing(|editor| {
            editor.delete(Some(Location::Range(Range::new(block_start, cursor))));
            match action {
                AutoformatAction::Block(kind) => editor.toggle_block(kind),
                AutoformatAction::List(kind) => editor.wrap_list(kind),
                AutoformatAction::NumberedList => match leading_number(&prefix) {
                    Some(start) if start != 1 => editor.wrap_numbered_list(start),
                    _ => editor.wrap_list(ElementKind::NumberedList),
                },
                AutoformatAction::Todo { checked } => editor.insert_todo_checked(checked),
            }
        });
        true
    }
}

fn already_applied(
    action: AutoformatAction,
    kind: ElementKind,
    list_kind: Option<ElementKind>,
) -> bool {
    match action {
        AutoformatAction::Block(target) => kind == target,
        AutoformatAction::List(target) => list_kind == Some(target),
        AutoformatAction::NumberedList => list_kind == Some(ElementKind::NumberedList),
        AutoformatAction::Todo { .. } => kind == ElementKind::TodoListItem,
    }
}

fn leading_number(prefix: &str) -> Option<u64> {
    let digits: String = prefix.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_compile() {
        assert!(Autoformat::new(&default_rules(), ' ').is_ok());
    }

    #[test]
    fn numbered_patterns_accept_dot_and_paren() {
        let rule = default_rules()
            .into_iter()
            .find(|r| r.action == AutoformatAction::NumberedList)
            .unwrap()
            .compile()
            .unwrap();
        assert!(rule.matches("1."));
        assert!(rule.matches("12)"));
        assert!(!rule.matches("1"));
        assert!(!rule.matches("a."));
    }

    #[test]
    fn leading_number_reads_digits() {
        assert_eq!(leading_number("3)"), Some(3));
        assert_eq!(leading_number("x"), None);
    }
}
