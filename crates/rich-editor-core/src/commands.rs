//! Slash command catalogue.

use serde::{Deserialize, Serialize};

use crate::core::Editor;
use crate::menu::MenuItem;
use crate::node::ElementKind;

pub const SLASH_EMPTY_TEXT: &str = "No matching commands";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlashAction {
    /// Turn the current block into this kind.
    Block(ElementKind),
    /// Wrap the current block in a list of this kind.
    List(ElementKind),
    Todo,
    Toggle,
    Callout,
}

impl SlashAction {
    pub fn run(self, editor: &mut Editor) {
        match self {
            SlashAction::Block(kind) => editor.set_block(kind),
            SlashAction::List(kind) => editor.wrap_list(kind),
            SlashAction::Todo => editor.insert_todo(),
            SlashAction::Toggle => editor.insert_toggle(),
            SlashAction::Callout => editor.insert_callout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashCommand {
    pub value: String,
    pub label: String,
    pub group: String,
    pub keywords: Vec<String>,
    pub action: SlashAction,
}

impl SlashCommand {
    pub fn new(value: impl Into<String>, label: impl Into<String>, action: SlashAction) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            group: String::new(),
            keywords: Vec::new(),
            action,
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

impl MenuItem for SlashCommand {
    fn label(&self) -> &str {
        &self.label
    }

    /// Case-insensitive substring match on value, label, group and keywords.
    fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        [&self.value, &self.label, &self.group]
            .into_iter()
            .chain(&self.keywords)
            .any(|term| term.to_lowercase().contains(&query))
    }

    fn apply(&self, editor: &mut Editor) {
        self.action.run(editor);
    }
}

pub fn default_slash_commands() -> Vec<SlashCommand> {
    const BLOCKS: &str = "Common blocks";
    const LISTS: &str = "Lists";

    vec![
        SlashCommand::new("paragraph", "Text", SlashAction::Block(ElementKind::Paragraph))
            .group(BLOCKS)
            .keywords(["paragraph"]),
        SlashCommand::new("h1", "Heading 1", SlashAction::Block(ElementKind::H1))
            .group(BLOCKS)
            .keywords(["h1", "title"]),
        SlashCommand::new("h2", "Heading 2", SlashAction::Block(ElementKind::H2))
            .group(BLOCKS)
            .keywords(["h2", "subtitle"]),
        SlashCommand::new("h3", "Heading 3", SlashAction::Block(ElementKind::H3))
            .group(BLOCKS)
            .keywords(["h3", "subtitle"]),
        SlashCommand::new("toggle", "Toggle", SlashAction::Toggle)
            .group(BLOCKS)
            .keywords(["collapsible", "expandable"]),
        SlashCommand::new("callout", "Callout", SlashAction::Callout)
            .group(BLOCKS)
            .keywords(["note", "tip"]),
        SlashCommand::new("blockquote", "Blockquote", SlashAction::Block(ElementKind::Blockquote))
            .group(BLOCKS)
            .keywords(["quote", "blockquote"]),
        SlashCommand::new("bulleted-list", "Bulleted list", SlashAction::List(ElementKind::BulletedList))
            .group(LISTS)
            .keywords(["unordered", "ul", "-"]),
        SlashCommand::new("numbered-list", "Numbered list", SlashAction::List(ElementKind::NumberedList))
            .group(LISTS)
            .keywords(["ordered", "ol", "1"]),
        SlashCommand::new("todo", "Todo list", SlashAction::Todo)
            .group(LISTS)
            .keywords(["todo", "task", "checkbox"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(query: &str) -> Vec<String> {
        default_slash_commands()
            .into_iter()
            .filter(|c| c.matches(query))
            .map(|c| c.value)
            .collect()
    }

    #[test]
    fn empty_query_lists_everything() {
        assert_eq!(values("").len(), default_slash_commands().len());
    }

    #[test]
    fn keywords_and_labels_match_case_insensitively() {
        assert_eq!(values("QUOTE"), vec!["blockquote"]);
        assert_eq!(values("ul"), vec!["bulleted-list"]);
        assert_eq!(values("heading"), vec!["h1", "h2", "h3"]);
    }

    #[test]
    fn group_names_match() {
        assert_eq!(values("lists").len(), 3);
    }
}
