//! JSON interchange for documents and the persistence hook.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::error::ImportError;
use crate::location::{Path, child_path};
use crate::node::{Document, Element, ElementKind, Marks, Node};

/// Serializes the document as a pretty-printed JSON array of blocks.
pub fn to_json(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

/// Parses and validates an exported document.
pub fn from_json(json: &str) -> Result<Document, ImportError> {
    let doc: Document = serde_json::from_str(json)?;
    validate(&doc)?;
    Ok(doc)
}

/// Checks structure that normalization cannot repair.
pub fn validate(doc: &Document) -> Result<(), ImportError> {
    for (ix, node) in doc.children.iter().enumerate() {
        let path = vec![ix];
        match node {
            Node::Element(el) if !el.kind.is_inline() => validate_element(el, &path)?,
            _ => return Err(invalid(path, "top-level entries must be blocks")),
        }
    }
    Ok(())
}

fn validate_element(el: &Element, path: &[usize]) -> Result<(), ImportError> {
    match el.kind {
        ElementKind::Mention if el.value().is_none() => {
            return Err(invalid(path.to_vec(), "mention requires a string `value`"));
        }
        ElementKind::Link if el.url().is_none() => {
            return Err(invalid(path.to_vec(), "link requires a string `url`"));
        }
        _ => {}
    }
    for (ix, child) in el.children.iter().enumerate() {
        let Node::Element(child_el) = child else {
            continue;
        };
        let child_at = child_path(path, ix);
        if el.kind.is_inline() && !child_el.kind.is_inline() {
            return Err(invalid(child_at, "inline elements cannot contain blocks"));
        }
        validate_element(child_el, &child_at)?;
    }
    Ok(())
}

fn invalid(path: Path, reason: &str) -> ImportError {
    ImportError::Invalid {
        path,
        reason: reason.to_string(),
    }
}

/// Where the serialized value lives between sessions.
pub trait ValueStore {
    fn load(&self) -> Option<String>;
    fn save(&mut self, json: &str);
}

/// In-memory store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Rc<RefCell<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(json: impl Into<String>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(json.into()))),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.slot.borrow().clone()
    }
}

impl ValueStore for MemoryStore {
    fn load(&self) -> Option<String> {
        self.get()
    }

    fn save(&mut self, json: &str) {
        *self.slot.borrow_mut() = Some(json.to_string());
    }
}

/// Loads the stored document, falling back to `fallback` when nothing is
/// stored or the stored value does not import.
pub fn load_or(store: &dyn ValueStore, fallback: Document) -> Document {
    let Some(json) = store.load() else {
        return fallback;
    };
    match from_json(&json) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(%err, "stored value is invalid, using the initial value");
            fallback
        }
    }
}

/// The starter document shown to a new user.
pub fn default_value() -> Document {
    let bold = Marks {
        bold: true,
        ..Marks::default()
    };
    let item = |text: &str| Node::element(ElementKind::ListItem, vec![Node::text(text)]);

    Document::new(vec![
        Node::element(ElementKind::H1, vec![Node::text("Welcome")]),
        Node::element(
            ElementKind::Paragraph,
            vec![
                Node::text("Type "),
                Node::marked("/", bold),
                Node::text(" for commands or @ to mention someone."),
            ],
        ),
        Node::element(
            ElementKind::Blockquote,
            vec![Node::text("Start a line with # or - to format it as you type.")],
        ),
        Element::new(
            ElementKind::Callout,
            vec![Node::text("Callouts keep a tip in view.")],
        )
        .with_attr("icon", "💡")
        .into(),
        Element::new(ElementKind::Toggle, vec![Node::text("Toggles fold away details.")])
            .with_attr("collapsed", false)
            .into(),
        Node::element(
            ElementKind::BulletedList,
            vec![item("Lists nest list items"), item("Enter on an empty item leaves the list")],
        ),
    ])
}
