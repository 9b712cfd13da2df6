//! Location-based transforms on [`Editor`].
//!
//! Every transform resolves its target location, lowers the edit to
//! [`Op`]s and applies them as one transaction. A location that no longer
//! resolves against the current document turns the call into a logged no-op.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::core::Editor;
use crate::error::EditorError;
use crate::inline::{self, Affinity};
use crate::location::{Direction, Edge, Location, Path, Point, Range, child_path, is_ancestor};
use crate::node::{Element, Node};
use crate::ops::{NodePatch, Op, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Matches without a matching descendant.
    #[default]
    Lowest,
    /// Matches without a matching ancestor.
    Highest,
    All,
}

pub type NodeMatcher<'a> = &'a dyn Fn(&Node, &[usize]) -> bool;

/// Target and filter of a node transform. Defaults to the lowest blocks in the selection.
#[derive(Default, Clone)]
pub struct NodeOptions<'a> {
    pub at: Option<Location>,
    pub matcher: Option<NodeMatcher<'a>>,
    pub mode: MatchMode,
    /// Split partially covered matches so only the covered part is affected.
    pub split: bool,
}

impl<'a> NodeOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, at: impl Into<Location>) -> Self {
        self.at = Some(at.into());
        self
    }

    pub fn matching(mut self, matcher: NodeMatcher<'a>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn split(mut self, split: bool) -> Self {
        self.split = split;
        self
    }
}

fn is_block(node: &Node, _path: &[usize]) -> bool {
    node.is_block()
}

impl Editor {
    pub(crate) fn commit(&mut self, tx: Transaction) -> bool {
        match self.apply(tx) {
            Ok(()) => true,
            Err(EditorError::ReadOnly) => false,
            Err(err) => {
                warn!(%err, "transform failed");
                false
            }
        }
    }

    /// `(start, end)` of a location, or of the selection when `at` is `None`.
    pub(crate) fn resolve_span(&self, at: Option<&Location>) -> Option<(Point, Point)> {
        let doc = self.doc();
        let (start, end) = match at {
            None => {
                let (start, end) = self.selection().edges();
                (start.clone(), end.clone())
            }
            Some(Location::Point(point)) => (point.clone(), point.clone()),
            Some(Location::Range(range)) => {
                let (start, end) = range.edges();
                (start.clone(), end.clone())
            }
            Some(Location::Path(path)) => (doc.first_point_in(path)?, doc.last_point_in(path)?),
        };
        (doc.resolves(&start) && doc.resolves(&end)).then_some((start, end))
    }

    pub fn nodes(&self, opts: &NodeOptions<'_>) -> Vec<Path> {
        let Some((start, end)) = self.resolve_span(opts.at.as_ref()) else {
            debug!(at = ?opts.at, "location does not resolve");
            return Vec::new();
        };
        let matcher = opts.matcher.unwrap_or(&is_block);

        let mut matched: Vec<Path> = Vec::new();
        self.doc().walk(&mut |path, node| {
            let touched = start.path.starts_with(path)
                || end.path.starts_with(path)
                || (path > start.path.as_slice() && path < end.path.as_slice());
            if touched && matcher(node, path) {
                matched.push(path.to_vec());
            }
        });

        match opts.mode {
            MatchMode::All => matched,
            MatchMode::Lowest => matched
                .iter()
                .filter(|p| !matched.iter().any(|q| is_ancestor(p, q)))
                .cloned()
                .collect(),
            MatchMode::Highest => matched
                .iter()
                .filter(|p| !matched.iter().any(|q| is_ancestor(q, p)))
                .cloned()
                .collect(),
        }
    }

    pub fn select(&mut self, at: impl Into<Location>) {
        let at = at.into();
        let range = match &at {
            Location::Range(range) => range.clone(),
            Location::Point(point) => Range::collapsed(point.clone()),
            Location::Path(_) => match self.resolve_span(Some(&at)) {
                Some((start, end)) => Range::new(start, end),
                None => {
                    debug!(?at, "select: location does not resolve");
                    return;
                }
            },
        };
        let doc = self.doc();
        if !doc.resolves(&range.anchor) || !doc.resolves(&range.focus) {
            debug!(?at, "select: location does not resolve");
            return;
        }
        self.set_selection_unchecked(range);
    }

    pub fn collapse(&mut self, edge: Edge) {
        let point = self.selection().edge(edge).clone();
        self.set_selection_unchecked(Range::collapsed(point));
    }

    pub fn move_selection(&mut self, distance: usize, direction: Direction) {
        let mut range = self.selection().clone();
        for point in [&mut range.anchor, &mut range.focus] {
            for _ in 0..distance {
                match self.step(point, direction) {
                    Some(next) => *point = next,
                    None => break,
                }
            }
        }
        self.set_selection_unchecked(range);
    }

    /// The position one character away from `point`. Crossing a void or a
    /// block boundary counts as one step.
    pub fn step(&self, point: &Point, direction: Direction) -> Option<Point> {
        let doc = self.doc();
        let block_path = doc.text_block_path(&point.path)?;
        let block = doc.element(&block_path)?;
        let g = inline::offset_in_block(block, &point.path[block_path.len()..], point.offset);
        let stepped = match direction {
            Direction::Forward => inline::step_forward(block, g),
            Direction::Backward => inline::step_backward(block, g),
        };
        if let Some(g) = stepped {
            return inline::point_in_block(&block_path, block, g, Affinity::Backward);
        }

        let blocks = doc.text_blocks();
        let ix = blocks.iter().position(|(path, _)| *path == block_path)?;
        match direction {
            Direction::Forward => {
                let (next, _) = blocks.get(ix + 1)?;
                doc.first_point_in(next)
            }
            Direction::Backward => {
                let (prev, _) = blocks.get(ix.checked_sub(1)?)?;
                doc.last_point_in(prev)
            }
        }
    }

    /// Removes the content of a range. A collapsed location removes one
    /// character forward; a path removes that node.
    pub fn delete(&mut self, at: Option<Location>) {
        let range = match at {
            None => self.selection().clone(),
            Some(Location::Range(range)) => range,
            Some(Location::Point(point)) => Range::collapsed(point),
            Some(Location::Path(path)) => {
                if self.doc().node(&path).is_none() {
                    debug!(?path, "delete: path does not resolve");
                    return;
                }
                self.commit(Transaction::new(vec![Op::RemoveNode { path }]).source("delete"));
                return;
            }
        };
        let doc = self.doc();
        if !doc.resolves(&range.anchor) || !doc.resolves(&range.focus) {
            debug!(?range, "delete: range does not resolve");
            return;
        }
        let (start, end) = range.edges();
        let (start, mut end) = (start.clone(), end.clone());
        if start == end {
            match self.step(&start, Direction::Forward) {
                Some(next) => end = next,
                None => return,
            }
        }
        self.delete_span(start, end);
    }

    fn delete_span(&mut self, start: Point, end: Point) {
        if start.path == end.path {
            let tx = Transaction::new(vec![Op::RemoveText {
                path: start.path.clone(),
                range: start.offset..end.offset,
            }])
            .selection_after(Range::collapsed(start))
            .source("delete");
            self.commit(tx);
            return;
        }

        self.without_normalizing(|editor| {
            let doc = editor.doc();
            let start_block = doc.text_block_path(&start.path);
            let end_block = doc.text_block_path(&end.path);

            let between = |path: &[usize]| {
                path > start.path.as_slice()
                    && path < end.path.as_slice()
                    && !is_ancestor(path, &start.path)
                    && !is_ancestor(path, &end.path)
            };
            let mut removed: Vec<Path> = Vec::new();
            doc.walk(&mut |path, _| {
                let parent_between = path
                    .split_last()
                    .is_some_and(|(_, parent)| !parent.is_empty() && between(parent));
                if between(path) && !parent_between {
                    removed.push(path.to_vec());
                }
            });
            let start_len = doc.leaf(&start.path).map_or(0, |t| t.text.len());

            let mut ops = vec![Op::RemoveText {
                path: end.path.clone(),
                range: 0..end.offset,
            }];
            ops.extend(removed.into_iter().rev().map(|path| Op::RemoveNode { path }));
            ops.push(Op::RemoveText {
                path: start.path.clone(),
                range: start.offset..start_len,
            });
            let tx = Transaction::new(ops)
                .selection_after(Range::collapsed(start.clone()))
                .source("delete");
            if !editor.commit(tx) {
                return;
            }

            let (Some(start_block), Some(end_block)) = (start_block, end_block) else {
                return;
            };
            if start_block != end_block {
                editor.merge_following_block(&start_block);
            }
        });
    }

    /// Moves the inline content of the text block after `block` into it and
    /// removes the emptied block.
    fn merge_following_block(&mut self, block: &[usize]) {
        let doc = self.doc();
        let next = end_block_after(self, block);
        if next.is_empty() || next.as_slice() == block {
            return;
        }
        let (Some(target), Some(source)) = (doc.element(block), doc.element(&next)) else {
            return;
        };
        let base = target.children.len();
        let mut ops: Vec<Op> = source
            .children
            .iter()
            .enumerate()
            .map(|(ix, child)| Op::InsertNode {
                path: child_path(block, base + ix),
                node: child.clone(),
            })
            .collect();
        ops.push(Op::RemoveNode { path: next });
        self.commit(Transaction::new(ops).source("delete"));
    }

    pub fn insert_text(&mut self, text: &str, at: Option<Location>) {
        if text.is_empty() {
            return;
        }
        self.without_normalizing(|editor| {
            let Some(point) = editor.collapse_for_insert(at) else {
                return;
            };
            if editor.doc().void_path(&point.path).is_some() {
                debug!(?point, "insert_text: point inside a void");
                return;
            }
            editor.commit(
                Transaction::new(vec![Op::InsertText {
                    path: point.path,
                    offset: point.offset,
                    text: text.to_string(),
                }])
                .source("insert_text"),
            );
        });
    }

    /// Deletes an expanded target and returns the point insertion happens at.
    fn collapse_for_insert(&mut self, at: Option<Location>) -> Option<Point> {
        match at {
            None => {
                if !self.selection().is_collapsed() {
                    self.delete(None);
                }
                Some(self.selection().focus.clone())
            }
            Some(Location::Point(point)) => self.doc().resolves(&point).then_some(point),
            Some(Location::Range(range)) => {
                let start = range.start().clone();
                if !range.is_collapsed() {
                    self.delete(Some(Location::Range(range)));
                }
                self.doc().resolves(&start).then_some(start)
            }
            Some(Location::Path(path)) => self.doc().first_point_in(&path),
        }
    }

    /// Inserts nodes. Inline nodes go at the cursor, splitting the leaf;
    /// blocks go after the current block, or exactly at a path location.
    pub fn insert_nodes(&mut self, nodes: Vec<Node>, at: Option<Location>) {
        if nodes.is_empty() {
            return;
        }
        if nodes.iter().all(Node::is_inline) {
            self.without_normalizing(|editor| {
                if let Some(point) = editor.collapse_for_insert(at) {
                    editor.insert_inlines(nodes, point);
                }
            });
            return;
        }

        let path = match at {
            Some(Location::Path(path)) => path,
            other => {
                let Some((point, _)) = self.resolve_span(other.as_ref()) else {
                    debug!("insert_nodes: location does not resolve");
                    return;
                };
                let Some(mut block) = self.doc().text_block_path(&point.path) else {
                    return;
                };
                if let Some(last) = block.last_mut() {
                    *last += 1;
                }
                block
            }
        };
        let Some((parent, index)) = crate::location::split_parent(&path) else {
            return;
        };
        let count = nodes.len();
        let ops = nodes
            .into_iter()
            .enumerate()
            .map(|(offset, node)| Op::InsertNode {
                path: child_path(parent, index + offset),
                node,
            })
            .collect();
        if !self.commit(Transaction::new(ops).source("insert_nodes")) {
            return;
        }
        let last = child_path(parent, index + count - 1);
        if let Some(point) = self.doc().last_point_in(&last) {
            self.set_selection_unchecked(Range::collapsed(point));
        }
    }

    fn insert_inlines(&mut self, mut nodes: Vec<Node>, point: Point) {
        let doc = self.doc();
        if doc.void_path(&point.path).is_some() {
            return;
        }
        let Some(leaf) = doc.leaf(&point.path) else {
            return;
        };
        let Some((parent, leaf_ix)) = crate::location::split_parent(&point.path) else {
            return;
        };
        let parent = parent.to_vec();
        let mut ops = Vec::new();
        let index = if point.offset == 0 {
            leaf_ix
        } else if point.offset >= leaf.text.len() {
            leaf_ix + 1
        } else {
            ops.push(Op::SplitNode {
                path: point.path.clone(),
                position: point.offset,
            });
            leaf_ix + 1
        };
        if matches!(nodes.last(), Some(Node::Element(_))) {
            nodes.push(Node::text(""));
        }
        let count = nodes.len();
        let trailing_text = nodes.last().and_then(Node::as_text).map(|t| t.text.len());
        ops.extend(nodes.into_iter().enumerate().map(|(offset, node)| Op::InsertNode {
            path: child_path(&parent, index + offset),
            node,
        }));
        let mut tx = Transaction::new(ops).source("insert_nodes");
        if let Some(len) = trailing_text {
            let caret = Point::new(child_path(&parent, index + count - 1), len);
            tx = tx.selection_after(Range::collapsed(caret));
        }
        self.commit(tx);
    }

    pub fn set_nodes(&mut self, patch: NodePatch, opts: NodeOptions<'_>) {
        let ops: Vec<Op> = self
            .nodes(&opts)
            .into_iter()
            .filter(|path| self.doc().element(path).is_some())
            .map(|path| Op::SetNode {
                path,
                patch: patch.clone(),
            })
            .collect();
        if !ops.is_empty() {
            self.commit(Transaction::new(ops).source("set_nodes"));
        }
    }

    pub fn unset_nodes(&mut self, keys: &[&str], opts: NodeOptions<'_>) {
        let patch = keys
            .iter()
            .fold(NodePatch::default(), |patch, key| patch.remove(*key));
        self.set_nodes(patch, opts);
    }

    /// Wraps matched blocks (or, for an inline wrapper, the selected text) in `wrapper`.
    pub fn wrap_nodes(&mut self, wrapper: Element, opts: NodeOptions<'_>) {
        if wrapper.kind.is_inline() {
            let Some((start, end)) = self.resolve_span(opts.at.as_ref()) else {
                return;
            };
            self.wrap_inline(wrapper, start, end);
            return;
        }

        let mut groups: BTreeMap<Path, (Path, usize, usize)> = BTreeMap::new();
        for path in self.nodes(&opts) {
            let Some((parent, ix)) = crate::location::split_parent(&path) else {
                continue;
            };
            let entry = groups
                .entry(parent.to_vec())
                .or_insert_with(|| (path.clone(), ix, ix));
            if path < entry.0 {
                entry.0 = path.clone();
            }
            entry.1 = entry.1.min(ix);
            entry.2 = entry.2.max(ix);
        }
        let mut groups: Vec<_> = groups.into_iter().collect();
        groups.sort_by(|a, b| b.1.0.cmp(&a.1.0));
        let ops: Vec<Op> = groups
            .into_iter()
            .map(|(parent, (_, first, last))| Op::WrapNodes {
                parent,
                range: first..last + 1,
                wrapper: wrapper.clone(),
            })
            .collect();
        if !ops.is_empty() {
            self.commit(Transaction::new(ops).source("wrap_nodes"));
        }
    }

    fn wrap_inline(&mut self, wrapper: Element, start: Point, end: Point) {
        if start == end {
            return;
        }
        let doc = self.doc();
        let mut ops = Vec::new();
        for (block_path, _) in doc.text_blocks().into_iter().rev() {
            let Some(first) = doc.first_point_in(&block_path) else {
                continue;
            };
            let Some(last) = doc.last_point_in(&block_path) else {
                continue;
            };
            if last < start || first > end {
                continue;
            }
            let from = if start.path.starts_with(&block_path) { start.clone() } else { first };
            let to = if end.path.starts_with(&block_path) { end.clone() } else { last };
            let depth = block_path.len();
            let direct = |p: &Point| p.path.len() == depth + 1;
            let len_of = |p: &Point| doc.leaf(&p.path).map_or(0, |t| t.text.len());

            let to_ix = to.path[depth];
            let mut range_end = if direct(&to) && to.offset == 0 { to_ix } else { to_ix + 1 };
            if direct(&to) && to.offset > 0 && to.offset < len_of(&to) {
                ops.push(Op::SplitNode {
                    path: to.path.clone(),
                    position: to.offset,
                });
            }
            let from_ix = from.path[depth];
            let mut range_start = from_ix;
            if direct(&from) && from.offset >= len_of(&from) && from.offset > 0 {
                range_start = from_ix + 1;
            } else if direct(&from) && from.offset > 0 {
                ops.push(Op::SplitNode {
                    path: from.path.clone(),
                    position: from.offset,
                });
                range_start = from_ix + 1;
                range_end += 1;
            }
            if range_start >= range_end {
                continue;
            }
            ops.push(Op::WrapNodes {
                parent: block_path,
                range: range_start..range_end,
                wrapper: wrapper.clone(),
            });
        }
        if !ops.is_empty() {
            self.commit(Transaction::new(ops).source("wrap_nodes"));
        }
    }

    /// Replaces matched elements by their children. With `split`, only the
    /// covered children are lifted and the rest stay wrapped.
    pub fn unwrap_nodes(&mut self, opts: NodeOptions<'_>) {
        let Some((start, end)) = self.resolve_span(opts.at.as_ref()) else {
            return;
        };
        let mut paths: Vec<Path> = self
            .nodes(&opts)
            .into_iter()
            .filter(|path| self.doc().element(path).is_some())
            .collect();
        paths.sort();

        let mut ops = Vec::new();
        for path in paths.into_iter().rev() {
            let Some(el) = self.doc().element(&path) else {
                continue;
            };
            if !opts.split {
                ops.push(Op::UnwrapNode { path });
                continue;
            }
            let depth = path.len();
            let count = el.children.len();
            let first = if start.path.starts_with(&path) { start.path[depth] } else { 0 };
            let last = if end.path.starts_with(&path) {
                end.path[depth]
            } else {
                count.saturating_sub(1)
            };
            if last + 1 < count {
                ops.push(Op::SplitNode {
                    path: path.clone(),
                    position: last + 1,
                });
            }
            let target = if first > 0 {
                ops.push(Op::SplitNode {
                    path: path.clone(),
                    position: first,
                });
                let mut next = path;
                if let Some(ix) = next.last_mut() {
                    *ix += 1;
                }
                next
            } else {
                path
            };
            ops.push(Op::UnwrapNode { path: target });
        }
        if !ops.is_empty() {
            self.commit(Transaction::new(ops).source("unwrap_nodes"));
        }
    }
}

/// The first text block after `block` in document order, or an empty path.
fn end_block_after(editor: &Editor, block: &[usize]) -> Path {
    editor
        .doc()
        .text_blocks()
        .into_iter()
        .map(|(path, _)| path)
        .find(|path| path.as_slice() > block && !path.starts_with(block))
        .unwrap_or_default()
}
