use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::location::{Path, Point};

pub type Attrs = BTreeMap<String, Value>;

/// The closed set of element types a document may contain.
///
/// Serialized as the `type` string of the interchange format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    #[serde(rename = "p")]
    Paragraph,
    #[serde(rename = "h1")]
    H1,
    #[serde(rename = "h2")]
    H2,
    #[serde(rename = "h3")]
    H3,
    #[serde(rename = "blockquote")]
    Blockquote,
    #[serde(rename = "code_block")]
    CodeBlock,
    #[serde(rename = "bulleted-list")]
    BulletedList,
    #[serde(rename = "numbered-list")]
    NumberedList,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "todo-list-item")]
    TodoListItem,
    #[serde(rename = "toggle")]
    Toggle,
    #[serde(rename = "callout")]
    Callout,
    #[serde(rename = "link")]
    Link,
    #[serde(rename = "mention")]
    Mention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    BlockOnly,
    InlineOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: ElementKind,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Paragraph => "p",
            ElementKind::H1 => "h1",
            ElementKind::H2 => "h2",
            ElementKind::H3 => "h3",
            ElementKind::Blockquote => "blockquote",
            ElementKind::CodeBlock => "code_block",
            ElementKind::BulletedList => "bulleted-list",
            ElementKind::NumberedList => "numbered-list",
            ElementKind::ListItem => "list-item",
            ElementKind::TodoListItem => "todo-list-item",
            ElementKind::Toggle => "toggle",
            ElementKind::Callout => "callout",
            ElementKind::Link => "link",
            ElementKind::Mention => "mention",
        }
    }

    pub fn spec(self) -> NodeSpec {
        let (role, is_void, children) = match self {
            ElementKind::BulletedList | ElementKind::NumberedList => {
                (NodeRole::Block, false, ChildConstraint::BlockOnly)
            }
            ElementKind::Link => (NodeRole::Inline, false, ChildConstraint::InlineOnly),
            ElementKind::Mention => (NodeRole::Inline, true, ChildConstraint::InlineOnly),
            _ => (NodeRole::Block, false, ChildConstraint::InlineOnly),
        };
        NodeSpec {
            kind: self,
            role,
            is_void,
            children,
        }
    }

    pub fn is_inline(self) -> bool {
        self.spec().role == NodeRole::Inline
    }

    pub fn is_void(self) -> bool {
        self.spec().is_void
    }

    pub fn is_list(self) -> bool {
        matches!(self, ElementKind::BulletedList | ElementKind::NumberedList)
    }

    /// Blocks whose children are inline content.
    pub fn is_text_block(self) -> bool {
        let spec = self.spec();
        spec.role == NodeRole::Block && spec.children == ChildConstraint::InlineOnly
    }
}

/// Boolean character formatting on a text leaf. `false` marks are omitted when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strikethrough: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

impl Marks {
    pub fn get(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Underline => self.underline,
            Mark::Strikethrough => self.strikethrough,
        }
    }

    pub fn set(&mut self, mark: Mark, value: bool) {
        match mark {
            Mark::Bold => self.bold = value,
            Mark::Italic => self.italic = value,
            Mark::Underline => self.underline = value,
            Mark::Strikethrough => self.strikethrough = value,
        }
    }

    pub fn with(mut self, mark: Mark, value: bool) -> Self {
        self.set(mark, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(flatten)]
    pub marks: Marks,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(flatten)]
    pub attrs: Attrs,
}

impl Element {
    pub fn new(kind: ElementKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            children,
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Paragraph, vec![Node::text(text)])
    }

    pub fn link(url: impl Into<String>, children: Vec<Node>) -> Self {
        Self::new(ElementKind::Link, children).with_attr("url", url.into())
    }

    pub fn mention(value: impl Into<String>, key: Option<&str>) -> Self {
        let el = Self::new(ElementKind::Mention, vec![Node::text("")]).with_attr("value", value.into());
        match key {
            Some(key) => el.with_attr("key", key),
            None => el,
        }
    }

    pub fn spec(&self) -> NodeSpec {
        self.kind.spec()
    }

    fn str_attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    fn bool_attr(&self, key: &str) -> Option<bool> {
        self.attrs.get(key).and_then(Value::as_bool)
    }

    pub fn checked(&self) -> Option<bool> {
        self.bool_attr("checked")
    }

    pub fn collapsed(&self) -> Option<bool> {
        self.bool_attr("collapsed")
    }

    pub fn url(&self) -> Option<&str> {
        self.str_attr("url")
    }

    pub fn value(&self) -> Option<&str> {
        self.str_attr("value")
    }

    pub fn key(&self) -> Option<&str> {
        self.str_attr("key")
    }

    pub fn icon(&self) -> Option<&str> {
        self.str_attr("icon")
    }

    pub fn list_style_type(&self) -> Option<&str> {
        self.str_attr("listStyleType")
    }

    pub fn list_start(&self) -> Option<u64> {
        self.attrs.get("listStart").and_then(Value::as_u64)
    }

    pub fn indent(&self) -> Option<u64> {
        self.attrs.get("indent").and_then(Value::as_u64)
    }

    pub fn string(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.push_string(&mut out);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(Text),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text::new(text))
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(Text::marked(text, marks))
    }

    pub fn element(kind: ElementKind, children: Vec<Node>) -> Self {
        Node::Element(Element::new(kind, children))
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::Element(Element::paragraph(text))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    pub fn kind(&self) -> Option<ElementKind> {
        self.as_element().map(|el| el.kind)
    }

    pub fn is_inline(&self) -> bool {
        match self {
            Node::Text(_) => true,
            Node::Element(el) => el.kind.is_inline(),
        }
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    pub fn string(&self) -> String {
        let mut out = String::new();
        self.push_string(&mut out);
        out
    }

    fn push_string(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(&t.text),
            Node::Element(el) => {
                for child in &el.children {
                    child.push_string(out);
                }
            }
        }
    }
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Node::Element(value)
    }
}

impl From<Text> for Node {
    fn from(value: Text) -> Self {
        Node::Text(value)
    }
}

/// The editable value: an ordered sequence of top-level blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Document {
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for &ix in rest {
            node = match node {
                Node::Element(el) => el.children.get(ix)?,
                Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    /// Children of the node at `parent`; the empty path addresses the root.
    pub fn children(&self, parent: &[usize]) -> Option<&[Node]> {
        if parent.is_empty() {
            return Some(&self.children);
        }
        match self.node(parent)? {
            Node::Element(el) => Some(&el.children),
            Node::Text(_) => None,
        }
    }

    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        self.node(path).and_then(Node::as_element)
    }

    pub fn leaf(&self, path: &[usize]) -> Option<&Text> {
        self.node(path).and_then(Node::as_text)
    }

    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&[usize], &'a Node)) {
        fn walk<'a>(children: &'a [Node], path: &mut Vec<usize>, f: &mut dyn FnMut(&[usize], &'a Node)) {
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                f(path, node);
                if let Node::Element(el) = node {
                    walk(&el.children, path, f);
                }
                path.pop();
            }
        }

        walk(&self.children, &mut Vec::new(), f);
    }

    /// Text leaves in document order, skipping the content of void elements.
    pub fn leaves(&self) -> Vec<(Path, &Text)> {
        fn walk<'a>(children: &'a [Node], path: &mut Vec<usize>, out: &mut Vec<(Path, &'a Text)>) {
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                match node {
                    Node::Text(t) => out.push((path.clone(), t)),
                    Node::Element(el) if el.kind.is_void() => {}
                    Node::Element(el) => walk(&el.children, path, out),
                }
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.children, &mut Vec::new(), &mut out);
        out
    }

    pub fn text_blocks(&self) -> Vec<(Path, &Element)> {
        fn walk<'a>(children: &'a [Node], path: &mut Vec<usize>, out: &mut Vec<(Path, &'a Element)>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if el.kind.is_text_block() {
                    out.push((path.clone(), el));
                } else if !el.kind.is_inline() {
                    walk(&el.children, path, out);
                }
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.children, &mut Vec::new(), &mut out);
        out
    }

    /// Path of the nearest text block containing `path` (inclusive).
    pub fn text_block_path(&self, path: &[usize]) -> Option<Path> {
        (1..=path.len())
            .rev()
            .map(|len| &path[..len])
            .find(|prefix| {
                self.element(prefix)
                    .is_some_and(|el| el.kind.is_text_block())
            })
            .map(<[usize]>::to_vec)
    }

    /// Path of the outermost void element containing `path` (inclusive).
    pub fn void_path(&self, path: &[usize]) -> Option<Path> {
        (1..=path.len())
            .map(|len| &path[..len])
            .find(|prefix| self.element(prefix).is_some_and(|el| el.kind.is_void()))
            .map(<[usize]>::to_vec)
    }

    pub fn first_point_in(&self, path: &[usize]) -> Option<Point> {
        self.leaves()
            .into_iter()
            .find(|(leaf, _)| leaf.starts_with(path))
            .map(|(leaf, _)| Point::new(leaf, 0))
    }

    pub fn last_point_in(&self, path: &[usize]) -> Option<Point> {
        self.leaves()
            .into_iter()
            .rev()
            .find(|(leaf, _)| leaf.starts_with(path))
            .map(|(leaf, t)| Point::new(leaf, t.text.len()))
    }

    pub fn start(&self) -> Option<Point> {
        self.first_point_in(&[])
    }

    pub fn end(&self) -> Option<Point> {
        self.last_point_in(&[])
    }

    /// Whether `point` addresses a text leaf at a char boundary.
    pub fn resolves(&self, point: &Point) -> bool {
        self.leaf(&point.path)
            .is_some_and(|t| point.offset <= t.text.len() && t.text.is_char_boundary(point.offset))
    }

    pub fn string(&self) -> String {
        self.children
            .iter()
            .map(Node::string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
