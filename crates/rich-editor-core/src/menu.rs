//! Inline context menus opened by a trigger character.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::Editor;
use crate::location::{Point, Range};
use crate::node::Document;
use crate::trigger::TriggerMatch;

pub trait MenuItem: Clone {
    fn label(&self) -> &str;

    /// Whether the item is listed for `query`. An empty query lists everything.
    fn matches(&self, query: &str) -> bool;

    /// Runs the item's action with the trigger text already removed.
    fn apply(&self, editor: &mut Editor);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuKey {
    ArrowUp,
    ArrowDown,
    Tab,
    Enter,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Screen position for the menu popup: just below the trigger text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MenuAnchor {
    pub x: f32,
    pub y: f32,
}

impl From<Rect> for MenuAnchor {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y + rect.height,
        }
    }
}

pub trait LayoutProvider {
    fn range_rect(&self, doc: &Document, range: &Range) -> Option<Rect>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenMenu<I> {
    pub target: Range,
    pub query: String,
    pub items: Vec<I>,
    pub active_index: usize,
    pub anchor: Option<MenuAnchor>,
}

impl<I> OpenMenu<I> {
    pub fn active_item(&self) -> Option<&I> {
        self.items.get(self.active_index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuState<I> {
    Closed,
    Open(OpenMenu<I>),
}

pub struct Menu<I> {
    name: &'static str,
    candidates: Vec<I>,
    state: MenuState<I>,
    empty_text: String,
    /// Marker position of an occurrence dismissed with Escape.
    dismissed: Option<Point>,
}

impl<I: MenuItem> Menu<I> {
    pub fn new(name: &'static str, candidates: Vec<I>) -> Self {
        Self {
            name,
            candidates,
            state: MenuState::Closed,
            empty_text: String::new(),
            dismissed: None,
        }
    }

    pub fn empty_text(mut self, text: impl Into<String>) -> Self {
        self.empty_text = text.into();
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn empty_message(&self) -> &str {
        &self.empty_text
    }

    pub fn state(&self) -> &MenuState<I> {
        &self.state
    }

    pub fn open_menu(&self) -> Option<&OpenMenu<I>> {
        match &self.state {
            MenuState::Open(open) => Some(open),
            MenuState::Closed => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, MenuState::Open(_))
    }

    pub fn candidates(&self) -> &[I] {
        &self.candidates
    }

    pub fn set_candidates(&mut self, candidates: Vec<I>) {
        self.candidates = candidates;
        if let MenuState::Open(open) = &mut self.state {
            open.items = filter(&self.candidates, &open.query);
            if open.active_index >= open.items.len() {
                open.active_index = 0;
            }
        }
    }

    pub fn sync(&mut self, found: Option<&TriggerMatch>) {
        let Some(found) = found else {
            self.dismissed = None;
            self.close();
            return;
        };
        if self.dismissed.as_ref() == Some(found.marker_point()) {
            return;
        }
        self.dismissed = None;

        let items = filter(&self.candidates, &found.query);
        match &mut self.state {
            MenuState::Open(open) if open.target.start() == found.marker_point() => {
                if open.query != found.query {
                    open.active_index = 0;
                } else if open.active_index >= items.len() {
                    open.active_index = 0;
                }
                open.target = found.range.clone();
                open.query = found.query.clone();
                open.items = items;
            }
            _ => {
                debug!(menu = self.name, query = %found.query, items = items.len(), "open menu");
                self.state = MenuState::Open(OpenMenu {
                    target: found.range.clone(),
                    query: found.query.clone(),
                    items,
                    active_index: 0,
                    anchor: None,
                });
            }
        }
    }

    pub fn handle_key(&mut self, key: MenuKey, editor: &mut Editor) -> KeyOutcome {
        let MenuState::Open(open) = &mut self.state else {
            return KeyOutcome::PassThrough;
        };
        let len = open.items.len();
        match key {
            MenuKey::ArrowDown => {
                open.active_index = if open.active_index + 1 >= len {
                    0
                } else {
                    open.active_index + 1
                };
            }
            MenuKey::ArrowUp => {
                open.active_index = if open.active_index == 0 {
                    len.saturating_sub(1)
                } else {
                    open.active_index - 1
                };
            }
            MenuKey::Tab | MenuKey::Enter => {
                self.commit(editor);
            }
            MenuKey::Escape => self.dismiss(),
        }
        KeyOutcome::Handled
    }

    /// Removes the trigger text and runs the active item. No-op without items.
    pub fn commit(&mut self, editor: &mut Editor) -> Option<I> {
        let open = self.open_menu()?;
        let item = open.active_item()?.clone();
        let target = open.target.clone();
        self.close();

        let doc = editor.doc();
        if !doc.resolves(&target.anchor) || !doc.resolves(&target.focus) {
            debug!(menu = self.name, "menu target is stale, not committing");
            return None;
        }
        debug!(menu = self.name, item = item.label(), "commit menu item");
        editor.without_normalizing(|editor| {
            editor.select(target);
            editor.delete(None);
            item.apply(editor);
        });
        Some(item)
    }

    /// Closes the menu; the same trigger occurrence does not reopen it.
    pub fn dismiss(&mut self) {
        if let MenuState::Open(open) = &self.state {
            self.dismissed = Some(open.target.start().clone());
        }
        self.close();
    }

    pub fn close(&mut self) {
        if self.is_open() {
            debug!(menu = self.name, "close menu");
        }
        self.state = MenuState::Closed;
    }

    pub fn set_anchor(&mut self, anchor: Option<MenuAnchor>) {
        if let MenuState::Open(open) = &mut self.state {
            open.anchor = anchor;
        }
    }
}

fn filter<I: MenuItem>(candidates: &[I], query: &str) -> Vec<I> {
    candidates
        .iter()
        .filter(|item| item.matches(query))
        .cloned()
        .collect()
}
