//! Block, list, link and mark algorithms built on the transforms.

use serde_json::Value;
use tracing::debug;

use crate::core::Editor;
use crate::location::{Direction, Edge, Location, Path, Point, Range, child_path, split_parent};
use crate::mention::MentionOption;
use crate::node::{Attrs, Document, Element, ElementKind, Mark, Node, Text};
use crate::ops::{NodePatch, Op, Transaction};
use crate::transforms::{MatchMode, NodeOptions};

fn is_text_block(node: &Node, _path: &[usize]) -> bool {
    node.kind().is_some_and(ElementKind::is_text_block)
}

fn is_list(node: &Node, _path: &[usize]) -> bool {
    node.kind().is_some_and(ElementKind::is_list)
}

fn is_list_item(node: &Node, _path: &[usize]) -> bool {
    node.kind() == Some(ElementKind::ListItem)
}

fn is_link(node: &Node, _path: &[usize]) -> bool {
    node.kind() == Some(ElementKind::Link)
}

/// Attributes owned by one kind; dropped when a block turns into another kind.
const KIND_ATTRS: [(&str, ElementKind); 2] = [
    ("checked", ElementKind::TodoListItem),
    ("collapsed", ElementKind::Toggle),
];

impl Editor {
    pub fn selected_blocks(&self) -> Vec<Path> {
        self.nodes(&NodeOptions::new().matching(&is_text_block))
    }

    fn selected_list_items(&self) -> Vec<Path> {
        self.selected_blocks()
            .into_iter()
            .filter(|path| {
                let in_list = split_parent(path)
                    .and_then(|(parent, _)| self.doc().element(parent))
                    .is_some_and(|parent| parent.kind.is_list());
                in_list && self.doc().element(path).is_some_and(|el| el.kind == ElementKind::ListItem)
            })
            .collect()
    }

    /// Sets the kind of every selected block, leaving any list first.
    fn turn_into(&mut self, kind: ElementKind, set: Attrs) {
        self.without_normalizing(|editor| {
            if kind != ElementKind::ListItem && !editor.selected_list_items().is_empty() {
                editor.unwrap_lists();
            }
            let mut patch = NodePatch::kind(kind);
            for (key, owner) in KIND_ATTRS {
                if owner != kind && !set.contains_key(key) {
                    patch = patch.remove(key);
                }
            }
            patch.set = set;
            editor.set_nodes(patch, NodeOptions::new().matching(&is_text_block));
        });
    }

    /// Turns the selected blocks into `kind`, or back into paragraphs when
    /// one of them already is. List kinds toggle list membership.
    pub fn toggle_block(&mut self, kind: ElementKind) {
        if kind.is_list() {
            self.toggle_list(kind);
            return;
        }
        if !kind.is_text_block() || kind == ElementKind::ListItem {
            debug!(kind = kind.as_str(), "toggle_block: not a block type");
            return;
        }
        let active = self.is_block_active(kind);
        let target = if active { ElementKind::Paragraph } else { kind };
        debug!(kind = kind.as_str(), target = target.as_str(), "toggle_block");
        self.turn_into(target, default_attrs(target));
    }

    pub fn set_block(&mut self, kind: ElementKind) {
        if kind.is_list() {
            self.wrap_list(kind);
            return;
        }
        if !kind.is_text_block() || kind == ElementKind::ListItem {
            debug!(kind = kind.as_str(), "set_block: not a block type");
            return;
        }
        self.turn_into(kind, default_attrs(kind));
    }

    fn toggle_list(&mut self, kind: ElementKind) {
        let blocks = self.selected_blocks();
        let all_in_list = !blocks.is_empty()
            && blocks.iter().all(|path| {
                split_parent(path)
                    .and_then(|(parent, _)| self.doc().element(parent))
                    .is_some_and(|parent| parent.kind == kind)
            });
        if all_in_list {
            self.unwrap_lists();
        } else {
            self.wrap_list(kind);
        }
    }

    pub fn wrap_list(&mut self, kind: ElementKind) {
        self.wrap_list_starting(kind, None);
    }

    pub fn wrap_numbered_list(&mut self, start: u64) {
        self.wrap_list_starting(ElementKind::NumberedList, Some(start));
    }

    fn wrap_list_starting(&mut self, kind: ElementKind, start: Option<u64>) {
        if !kind.is_list() {
            debug!(kind = kind.as_str(), "wrap_list: not a list type");
            return;
        }
        self.without_normalizing(|editor| {
            editor.unwrap_lists();
            editor.set_nodes(
                NodePatch::kind(ElementKind::ListItem)
                    .remove("checked")
                    .remove("collapsed"),
                NodeOptions::new().matching(&is_text_block),
            );
            let mut wrapper = Element::new(kind, Vec::new());
            if let (ElementKind::NumberedList, Some(start)) = (kind, start) {
                wrapper = wrapper.with_attr("listStart", start);
            }
            editor.wrap_nodes(wrapper, NodeOptions::new().matching(&is_list_item));
        });
    }

    /// Lifts the selected list items out of their lists; they become paragraphs.
    pub fn unwrap_lists(&mut self) {
        self.unwrap_nodes(
            NodeOptions::new()
                .matching(&is_list)
                .mode(MatchMode::All)
                .split(true),
        );
    }

    pub fn insert_todo(&mut self) {
        self.insert_todo_checked(false);
    }

    pub fn insert_todo_checked(&mut self, checked: bool) {
        let mut attrs = Attrs::new();
        attrs.insert("checked".into(), Value::Bool(checked));
        self.turn_into(ElementKind::TodoListItem, attrs);
    }

    pub fn insert_toggle(&mut self) {
        self.turn_into(ElementKind::Toggle, default_attrs(ElementKind::Toggle));
    }

    pub fn insert_callout(&mut self) {
        self.turn_into(ElementKind::Callout, Attrs::new());
    }

    /// Inserts a mention at the cursor and places the cursor right after it.
    pub fn insert_mention(&mut self, option: &MentionOption) {
        let mention = Element::mention(option.text.clone(), Some(option.key.as_str()));
        self.insert_nodes(vec![mention.into()], None);
    }

    /// Links the selected text, or inserts the url as linked text at a caret.
    pub fn wrap_link(&mut self, url: &str) {
        self.without_normalizing(|editor| {
            if editor.active_link().is_some() {
                editor.unwrap_link();
            }
            if editor.selection().is_collapsed() {
                let link = Element::link(url, vec![Node::text(url)]);
                editor.insert_nodes(vec![link.into()], None);
            } else {
                editor.wrap_nodes(Element::link(url, Vec::new()), NodeOptions::new());
                editor.collapse(Edge::End);
            }
        });
    }

    pub fn unwrap_link(&mut self) {
        self.unwrap_nodes(
            NodeOptions::new()
                .matching(&is_link)
                .mode(MatchMode::All),
        );
    }

    pub fn is_block_active(&self, kind: ElementKind) -> bool {
        if kind.is_list() {
            return self.nodes(&NodeOptions::new().matching(&is_list).mode(MatchMode::All))
                .iter()
                .any(|path| self.doc().element(path).is_some_and(|el| el.kind == kind));
        }
        self.selected_blocks()
            .iter()
            .any(|path| self.doc().element(path).is_some_and(|el| el.kind == kind))
    }

    pub fn active_link(&self) -> Option<String> {
        self.nodes(&NodeOptions::new().matching(&is_link).mode(MatchMode::All))
            .first()
            .and_then(|path| self.doc().element(path))
            .and_then(|el| el.url().map(str::to_string))
    }

    /// Leaves in the selection with the byte range each one has selected.
    /// At a caret this is the focused leaf with an empty range.
    fn selected_leaves(&self) -> Vec<(Path, usize, usize)> {
        let (start, end) = self.selection().edges();
        if start == end {
            return vec![(start.path.clone(), start.offset, start.offset)];
        }
        self.doc()
            .leaves()
            .into_iter()
            .filter(|(path, _)| *path >= start.path && *path <= end.path)
            .filter_map(|(path, t)| {
                let from = if path == start.path { start.offset } else { 0 };
                let to = if path == end.path { end.offset } else { t.text.len() };
                (from < to).then_some((path, from, to))
            })
            .collect()
    }

    pub fn is_mark_active(&self, mark: Mark) -> bool {
        let leaves = self.selected_leaves();
        !leaves.is_empty()
            && leaves.iter().all(|(path, _, _)| {
                self.doc()
                    .leaf(path)
                    .is_some_and(|t| t.marks.get(mark))
            })
    }

    /// Toggles a mark over the selection. At a caret, starts an empty leaf
    /// carrying the toggled marks so the next typed text picks them up.
    pub fn toggle_mark(&mut self, mark: Mark) {
        if self.selection().is_collapsed() {
            self.toggle_mark_at_caret(mark);
            return;
        }
        let target = !self.is_mark_active(mark);
        let mut ops = Vec::new();
        for (path, from, to) in self.selected_leaves().into_iter().rev() {
            let Some(leaf) = self.doc().leaf(&path) else {
                continue;
            };
            if leaf.marks.get(mark) == target {
                continue;
            }
            let marks = leaf.marks.with(mark, target);
            if to < leaf.text.len() {
                ops.push(Op::SplitNode {
                    path: path.clone(),
                    position: to,
                });
            }
            let mut target_path = path.clone();
            if from > 0 {
                ops.push(Op::SplitNode {
                    path: path.clone(),
                    position: from,
                });
                if let Some(ix) = target_path.last_mut() {
                    *ix += 1;
                }
            }
            ops.push(Op::SetMarks {
                path: target_path,
                marks,
            });
        }
        if !ops.is_empty() {
            self.commit(Transaction::new(ops).source("toggle_mark"));
        }
    }

    fn toggle_mark_at_caret(&mut self, mark: Mark) {
        let point = self.selection().focus.clone();
        let Some(leaf) = self.doc().leaf(&point.path) else {
            return;
        };
        let marks = leaf.marks.with(mark, !leaf.marks.get(mark));
        if leaf.text.is_empty() {
            self.commit(
                Transaction::new(vec![Op::SetMarks {
                    path: point.path,
                    marks,
                }])
                .source("toggle_mark"),
            );
            return;
        }
        let Some((parent, ix)) = split_parent(&point.path) else {
            return;
        };
        let mut ops = Vec::new();
        let index = if point.offset == 0 {
            ix
        } else if point.offset >= leaf.text.len() {
            ix + 1
        } else {
            ops.push(Op::SplitNode {
                path: point.path.clone(),
                position: point.offset,
            });
            ix + 1
        };
        let caret = child_path(parent, index);
        ops.push(Op::InsertNode {
            path: caret.clone(),
            node: Text::marked("", marks).into(),
        });
        let tx = Transaction::new(ops)
            .selection_after(Range::collapsed(Point::new(caret, 0)))
            .source("toggle_mark");
        self.commit(tx);
    }

    pub fn toggle_todo_checked(&mut self, at: Option<Path>) {
        self.flip_bool_attr(ElementKind::TodoListItem, "checked", at);
    }

    pub fn toggle_collapsed(&mut self, at: Option<Path>) {
        self.flip_bool_attr(ElementKind::Toggle, "collapsed", at);
    }

    fn flip_bool_attr(&mut self, kind: ElementKind, key: &str, at: Option<Path>) {
        let path = match at {
            Some(path) => path,
            None => {
                let focus = &self.selection().focus;
                let Some(path) = self.doc().text_block_path(&focus.path) else {
                    return;
                };
                path
            }
        };
        let Some(el) = self.doc().element(&path).filter(|el| el.kind == kind) else {
            debug!(?path, kind = kind.as_str(), "flip attribute: no matching block");
            return;
        };
        let current = el.attrs.get(key).and_then(Value::as_bool).unwrap_or(false);
        let op = Op::SetNode {
            path,
            patch: NodePatch::default().set(key, !current),
        };
        self.commit(Transaction::new(vec![op]).source("flip_attr"));
    }

    /// Splits the current block at the cursor. An empty list item leaves its list instead.
    pub fn insert_break(&mut self) {
        self.without_normalizing(|editor| {
            if !editor.selection().is_collapsed() {
                editor.delete(None);
            }
            let focus = editor.selection().focus.clone();
            let Some(block_path) = editor.doc().text_block_path(&focus.path) else {
                return;
            };
            let point = outside_inline_edge(editor.doc(), &block_path, focus.clone());
            if point != focus {
                editor.select(point.clone());
            }
            let doc = editor.doc();
            let Some(block) = doc.element(&block_path) else {
                return;
            };
            if doc.void_path(&point.path).is_some() {
                return;
            }

            if block.kind == ElementKind::ListItem && block.string().is_empty() {
                editor.unwrap_nodes(
                    NodeOptions::new()
                        .at(Location::Path(block_path))
                        .matching(&is_list)
                        .mode(MatchMode::All)
                        .split(true),
                );
                return;
            }

            let kind = block.kind;
            let depth = block_path.len();
            let rel = &point.path[depth..];
            let mut ops = vec![Op::SplitNode {
                path: point.path.clone(),
                position: point.offset,
            }];
            if rel.len() > 1 {
                ops.push(Op::SplitNode {
                    path: child_path(&block_path, rel[0]),
                    position: rel[1] + 1,
                });
            }
            ops.push(Op::SplitNode {
                path: block_path.clone(),
                position: rel[0] + 1,
            });

            let mut next = block_path.clone();
            if let Some(ix) = next.last_mut() {
                *ix += 1;
            }
            let reset = match kind {
                ElementKind::H1 | ElementKind::H2 | ElementKind::H3 => {
                    Some(NodePatch::kind(ElementKind::Paragraph))
                }
                ElementKind::TodoListItem => Some(NodePatch::default().set("checked", false)),
                _ => None,
            };
            if let Some(patch) = reset {
                ops.push(Op::SetNode { path: next, patch });
            }
            editor.commit(Transaction::new(ops).source("insert_break"));
        });
    }

    /// Backspace. At the start of a list item or a non-paragraph block the
    /// block is reset instead of merged.
    pub fn delete_backward(&mut self) {
        if !self.selection().is_collapsed() {
            self.delete(None);
            return;
        }
        let point = self.selection().focus.clone();
        let at_block_start = self
            .doc()
            .text_block_path(&point.path)
            .filter(|block| block_offset_is_zero(self, block, &point))
            .and_then(|block| self.doc().element(&block).map(|el| el.kind));
        match at_block_start {
            Some(ElementKind::ListItem) => {
                self.unwrap_lists();
                return;
            }
            Some(kind) if kind != ElementKind::Paragraph && kind != ElementKind::ListItem => {
                self.turn_into(ElementKind::Paragraph, Attrs::new());
                return;
            }
            _ => {}
        }
        let Some(prev) = self.step(&point, Direction::Backward) else {
            return;
        };
        self.delete(Some(Location::Range(Range::new(prev, point))));
    }

    pub fn delete_forward(&mut self) {
        self.delete(None);
    }
}

fn block_offset_is_zero(editor: &Editor, block: &[usize], point: &Point) -> bool {
    let Some(el) = editor.doc().element(block) else {
        return false;
    };
    crate::inline::offset_in_block(el, &point.path[block.len()..], point.offset) == 0
}

// A caret on the outer edge of a link belongs to the text beside it.
fn outside_inline_edge(doc: &Document, block_path: &[usize], point: Point) -> Point {
    let rel = &point.path[block_path.len()..];
    if rel.len() != 2 {
        return point;
    }
    let (Some(children), Some(leaf)) = (
        doc.children(&child_path(block_path, rel[0])),
        doc.leaf(&point.path),
    ) else {
        return point;
    };
    if point.offset == leaf.text.len() && rel[1] + 1 == children.len() {
        let after = child_path(block_path, rel[0] + 1);
        if doc.leaf(&after).is_some() {
            return Point::new(after, 0);
        }
    } else if point.offset == 0 && rel[1] == 0 && rel[0] > 0 {
        let before = child_path(block_path, rel[0] - 1);
        if let Some(prev) = doc.leaf(&before) {
            return Point::new(before, prev.text.len());
        }
    }
    point
}

fn default_attrs(kind: ElementKind) -> Attrs {
    let mut attrs = Attrs::new();
    match kind {
        ElementKind::TodoListItem => {
            attrs.insert("checked".into(), Value::Bool(false));
        }
        ElementKind::Toggle => {
            attrs.insert("collapsed".into(), Value::Bool(false));
        }
        _ => {}
    }
    attrs
}
