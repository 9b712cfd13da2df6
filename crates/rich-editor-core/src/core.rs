use tracing::{debug, trace, warn};

use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::location::{Path, Point, Range, split_parent};
use crate::node::{Attrs, Document, Element, Node, Text};
use crate::normalize::Normalizer;
use crate::ops::{NodePatch, Op, Transaction};

const DEFAULT_MAX_NORMALIZE_ITERATIONS: usize = 100;

/// Owns the document and selection. All mutation goes through [`Editor::apply`].
pub struct Editor {
    doc: Document,
    selection: Range,
    normalizer: Normalizer,
    max_normalize_iterations: usize,
    batch_depth: usize,
    pending_normalize: bool,
    revision: u64,
    read_only: bool,
}

impl Editor {
    pub fn new(doc: Document) -> Self {
        let selection = Range::collapsed(Point::new(vec![0, 0], 0));
        Self::with_selection(doc, selection)
    }

    pub fn with_selection(doc: Document, selection: Range) -> Self {
        Self::build(doc, selection, DEFAULT_MAX_NORMALIZE_ITERATIONS)
    }

    pub fn with_config(doc: Document, config: &EditorConfig) -> Self {
        let selection = Range::collapsed(Point::new(vec![0, 0], 0));
        let iterations = match config.max_normalize_iterations {
            0 => DEFAULT_MAX_NORMALIZE_ITERATIONS,
            n => n,
        };
        Self::build(doc, selection, iterations)
    }

    /// A preview editor: every transform becomes a no-op.
    pub fn read_only(doc: Document) -> Self {
        let mut editor = Self::new(doc);
        editor.read_only = true;
        editor
    }

    fn build(doc: Document, selection: Range, max_normalize_iterations: usize) -> Self {
        let mut editor = Self {
            doc,
            selection,
            normalizer: Normalizer::default(),
            max_normalize_iterations,
            batch_depth: 0,
            pending_normalize: false,
            revision: 0,
            read_only: false,
        };
        editor.normalize();
        editor
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Range {
        &self.selection
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn replace_document(&mut self, doc: Document) {
        if self.read_only {
            debug!("rejecting document replacement on read-only editor");
            return;
        }
        self.doc = doc;
        self.selection = Range::collapsed(Point::new(vec![0, 0], 0));
        self.revision += 1;
        self.normalize();
    }

    /// Applies a batch of operations atomically.
    ///
    /// Ops run against a scratch copy; the document and selection are only
    /// replaced when every op succeeded.
    pub fn apply(&mut self, tx: Transaction) -> Result<(), EditorError> {
        if self.read_only {
            debug!(source = ?tx.meta.source, "rejecting transaction on read-only editor");
            return Err(EditorError::ReadOnly);
        }
        if tx.is_empty() {
            return Ok(());
        }

        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();
        for op in tx.ops {
            trace!(?op, "apply op");
            apply_op_to(&mut doc, &mut selection, op)?;
        }
        if let Some(sel) = tx.selection_after {
            selection = sel;
        }

        if self.batch_depth == 0 {
            self.normalize_to(&mut doc, &mut selection)?;
        } else {
            self.pending_normalize = true;
        }

        self.doc = doc;
        self.selection = selection;
        self.revision += 1;
        Ok(())
    }

    pub fn without_normalizing<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let out = f(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 && self.pending_normalize {
            self.pending_normalize = false;
            self.normalize();
        }
        out
    }

    pub fn is_normalizing_deferred(&self) -> bool {
        self.batch_depth > 0
    }

    /// Restores the structural rules. Leaves the document as-is if the passes do not converge.
    pub fn normalize(&mut self) {
        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();
        match self.normalize_to(&mut doc, &mut selection) {
            Ok(()) => {
                self.doc = doc;
                self.selection = selection;
            }
            Err(err) => warn!(%err, "normalization failed"),
        }
    }

    fn normalize_to(&self, doc: &mut Document, selection: &mut Range) -> Result<(), EditorError> {
        let mut converged = false;
        for _ in 0..self.max_normalize_iterations {
            let Some((id, ops)) = self.normalizer.next_fix(doc) else {
                converged = true;
                break;
            };
            debug!(pass = id, ops = ops.len(), "normalize");
            for op in ops {
                apply_op_to(doc, selection, op)?;
            }
        }
        if !converged {
            return Err(EditorError::NormalizeDidNotConverge(
                self.max_normalize_iterations,
            ));
        }
        *selection = normalize_selection(doc, selection);
        Ok(())
    }

    pub(crate) fn set_selection_unchecked(&mut self, selection: Range) {
        if self.selection != selection {
            self.selection = normalize_selection(&self.doc, &selection);
            self.revision += 1;
        }
    }
}

/// Maps a selection onto existing, non-void text leaves.
pub fn normalize_selection(doc: &Document, selection: &Range) -> Range {
    let fallback = doc.start().unwrap_or_else(|| Point::new(vec![0], 0));

    let anchor = normalize_point(doc, &selection.anchor).unwrap_or_else(|| {
        normalize_point(doc, &selection.focus).unwrap_or_else(|| fallback.clone())
    });
    let focus = normalize_point(doc, &selection.focus).unwrap_or_else(|| anchor.clone());

    Range { anchor, focus }
}

fn normalize_point(doc: &Document, point: &Point) -> Option<Point> {
    if let Some(void) = doc.void_path(&point.path) {
        let leaves = doc.leaves();
        if let Some((path, _)) = leaves
            .iter()
            .find(|(path, _)| path.as_slice() > void.as_slice() && !path.starts_with(&void))
        {
            return Some(Point::new(path.clone(), 0));
        }
        return leaves
            .iter()
            .rev()
            .find(|(path, _)| path.as_slice() < void.as_slice())
            .map(|(path, t)| Point::new(path.clone(), t.text.len()));
    }

    let mut resolved: Path = Vec::new();
    let mut children: &[Node] = &doc.children;
    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                let offset = clamp_to_char_boundary(&t.text, point.offset);
                return Some(Point::new(resolved, offset));
            }
            Node::Element(el) if el.kind.is_void() => break,
            Node::Element(el) => children = &el.children,
        }
    }

    doc.first_point_in(&resolved)
        .or_else(|| doc.start())
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

pub(crate) fn apply_op_to(
    doc: &mut Document,
    selection: &mut Range,
    op: Op,
) -> Result<(), EditorError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let leaf = text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&leaf.text, offset);
            leaf.text.insert_str(offset, &text);
            for point in points_mut(selection) {
                if point.path == path && point.offset >= offset {
                    point.offset += text.len();
                }
            }
        }
        Op::RemoveText { path, range } => {
            let leaf = text_mut(doc, &path)?;
            let start = clamp_to_char_boundary(&leaf.text, range.start);
            let end = clamp_to_char_boundary(&leaf.text, range.end);
            if start >= end {
                return Ok(());
            }
            leaf.text.replace_range(start..end, "");
            for point in points_mut(selection) {
                if point.path != path || point.offset <= start {
                    continue;
                }
                if point.offset >= end {
                    point.offset -= end - start;
                } else {
                    point.offset = start;
                }
            }
        }
        Op::InsertNode { path, node } => {
            let (parent, index) = split(&path)?;
            let children = children_mut(doc, parent)?;
            if index > children.len() {
                return Err(EditorError::InvalidPath(format!(
                    "Insert index out of bounds: {index} > {}",
                    children.len()
                )));
            }
            children.insert(index, node);
            for point in points_mut(selection) {
                shift_siblings(point, parent, index, 1);
            }
        }
        Op::RemoveNode { path } => {
            let (parent, index) = split(&path)?;
            if index >= children_mut(doc, parent)?.len() {
                return Err(EditorError::InvalidPath(format!(
                    "Remove index out of bounds: {path:?}"
                )));
            }
            let fallback = removal_fallback(doc, &path);
            children_mut(doc, parent)?.remove(index);
            for point in points_mut(selection) {
                if point.path.starts_with(&path) {
                    *point = fallback.clone();
                } else {
                    shift_siblings(point, parent, index + 1, -1);
                }
            }
        }
        Op::MergeNode { path } => {
            let (parent, index) = split(&path)?;
            if index == 0 {
                return Err(EditorError::InvalidOperation(format!(
                    "Cannot merge first child at {path:?}"
                )));
            }
            let children = children_mut(doc, parent)?;
            if index >= children.len() {
                return Err(EditorError::InvalidPath(format!(
                    "Merge index out of bounds: {path:?}"
                )));
            }
            let compatible = matches!(
                (&children[index - 1], &children[index]),
                (Node::Text(_), Node::Text(_)) | (Node::Element(_), Node::Element(_))
            );
            if !compatible {
                return Err(EditorError::InvalidOperation(format!(
                    "Cannot merge text with element at {path:?}"
                )));
            }
            let node = children.remove(index);
            let prev_len = match (&mut children[index - 1], node) {
                (Node::Text(prev), Node::Text(cur)) => {
                    let len = prev.text.len();
                    prev.text.push_str(&cur.text);
                    len
                }
                (Node::Element(prev), Node::Element(cur)) => {
                    let len = prev.children.len();
                    prev.children.extend(cur.children);
                    len
                }
                _ => 0,
            };
            let depth = parent.len();
            for point in points_mut(selection) {
                if point.path.starts_with(&path) {
                    point.path[depth] = index - 1;
                    if point.path.len() == depth + 1 {
                        point.offset += prev_len;
                    } else {
                        point.path[depth + 1] += prev_len;
                    }
                } else {
                    shift_siblings(point, parent, index + 1, -1);
                }
            }
        }
        Op::SplitNode { path, position } => {
            let (parent, index) = split(&path)?;
            let children = children_mut(doc, parent)?;
            let Some(node) = children.get_mut(index) else {
                return Err(EditorError::InvalidPath(format!(
                    "Split index out of bounds: {path:?}"
                )));
            };
            let (right, position) = match node {
                Node::Text(t) => {
                    let position = clamp_to_char_boundary(&t.text, position);
                    let right = t.text.split_off(position);
                    (Node::Text(Text::marked(right, t.marks)), position)
                }
                Node::Element(el) => {
                    let position = position.min(el.children.len());
                    let right = el.children.split_off(position);
                    let mut sibling = Element::new(el.kind, right);
                    sibling.attrs = el.attrs.clone();
                    (Node::Element(sibling), position)
                }
            };
            children.insert(index + 1, right);
            let depth = parent.len();
            for point in points_mut(selection) {
                shift_siblings(point, parent, index + 1, 1);
                if !point.path.starts_with(&path) {
                    continue;
                }
                if point.path.len() == depth + 1 {
                    if point.offset >= position {
                        point.path[depth] += 1;
                        point.offset -= position;
                    }
                } else if point.path[depth + 1] >= position {
                    point.path[depth] += 1;
                    point.path[depth + 1] -= position;
                }
            }
        }
        Op::WrapNodes {
            parent,
            range,
            mut wrapper,
        } => {
            let children = children_mut(doc, &parent)?;
            if range.start >= range.end || range.end > children.len() {
                return Err(EditorError::InvalidOperation(format!(
                    "Invalid wrap range {range:?} under {parent:?}"
                )));
            }
            wrapper.children = children.drain(range.clone()).collect();
            children.insert(range.start, Node::Element(wrapper));
            let depth = parent.len();
            let width = range.end - range.start;
            for point in points_mut(selection) {
                if point.path.len() <= depth || !point.path.starts_with(&parent) {
                    continue;
                }
                let ix = point.path[depth];
                if range.contains(&ix) {
                    point.path[depth] = range.start;
                    point.path.insert(depth + 1, ix - range.start);
                } else if ix >= range.end {
                    point.path[depth] = ix - (width - 1);
                }
            }
        }
        Op::UnwrapNode { path } => {
            let (parent, index) = split(&path)?;
            let children = children_mut(doc, parent)?;
            let Some(Node::Element(_)) = children.get(index) else {
                return Err(EditorError::InvalidOperation(format!(
                    "Cannot unwrap non-element at {path:?}"
                )));
            };
            let Node::Element(el) = children.remove(index) else {
                return Err(EditorError::InvalidPath(format!("{path:?}")));
            };
            let count = el.children.len();
            children.splice(index..index, el.children);
            let depth = parent.len();
            for point in points_mut(selection) {
                if point.path.len() > path.len() && point.path.starts_with(&path) {
                    let inner = point.path.remove(depth + 1);
                    point.path[depth] = index + inner;
                } else {
                    shift_siblings(point, parent, index + 1, count as isize - 1);
                }
            }
        }
        Op::SetNode { path, patch } => match node_mut(doc, &path)? {
            Node::Element(el) => patch_apply(el, &patch),
            Node::Text(_) => {
                return Err(EditorError::InvalidOperation(format!(
                    "Text at {path:?} has no attributes"
                )));
            }
        },
        Op::SetMarks { path, marks } => {
            text_mut(doc, &path)?.marks = marks;
        }
    }
    Ok(())
}

fn points_mut(selection: &mut Range) -> [&mut Point; 2] {
    [&mut selection.anchor, &mut selection.focus]
}

/// Shifts points under `parent` whose child index is at least `from`.
fn shift_siblings(point: &mut Point, parent: &[usize], from: usize, delta: isize) {
    let depth = parent.len();
    if point.path.len() <= depth || !point.path.starts_with(parent) {
        return;
    }
    if point.path[depth] >= from {
        point.path[depth] = point.path[depth].saturating_add_signed(delta);
    }
}

/// Where a point inside a removed subtree lands: end of the previous leaf,
/// otherwise start of the next one.
fn removal_fallback(doc: &Document, removed: &[usize]) -> Point {
    let leaves = doc.leaves();
    if let Some((path, t)) = leaves
        .iter()
        .rev()
        .find(|(path, _)| path.as_slice() < removed && !path.starts_with(removed))
    {
        return Point::new(path.clone(), t.text.len());
    }
    if let Some((path, _)) = leaves
        .iter()
        .find(|(path, _)| path.as_slice() > removed && !path.starts_with(removed))
    {
        let mut point = Point::new(path.clone(), 0);
        if let Some((parent, index)) = split_parent(removed) {
            shift_siblings(&mut point, parent, index + 1, -1);
        }
        return point;
    }
    Point::new(vec![0], 0)
}

fn patch_apply(el: &mut Element, patch: &NodePatch) {
    if let Some(kind) = patch.kind {
        el.kind = kind;
    }
    let attrs: &mut Attrs = &mut el.attrs;
    for (k, v) in &patch.set {
        attrs.insert(k.clone(), v.clone());
    }
    for key in &patch.remove {
        attrs.remove(key);
    }
}

fn split(path: &[usize]) -> Result<(&[usize], usize), EditorError> {
    split_parent(path).ok_or_else(|| EditorError::InvalidPath("Empty path".into()))
}

fn children_mut<'a>(doc: &'a mut Document, parent: &[usize]) -> Result<&'a mut Vec<Node>, EditorError> {
    let mut children = &mut doc.children;
    for (depth, &ix) in parent.iter().enumerate() {
        let len = children.len();
        children = match children.get_mut(ix) {
            Some(Node::Element(el)) => &mut el.children,
            Some(Node::Text(_)) => {
                return Err(EditorError::InvalidPath(format!(
                    "Non-container node at depth {depth}"
                )));
            }
            None => {
                return Err(EditorError::InvalidPath(format!(
                    "Path out of bounds at depth {depth}: {ix} >= {len}"
                )));
            }
        };
    }
    Ok(children)
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, EditorError> {
    let (parent, index) = split(path)?;
    let children = children_mut(doc, parent)?;
    let len = children.len();
    children.get_mut(index).ok_or_else(|| {
        EditorError::InvalidPath(format!("Path out of bounds: {index} >= {len}"))
    })
}

fn text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Text, EditorError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        Node::Element(_) => Err(EditorError::InvalidPath(format!(
            "Expected text leaf at {path:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::child_path;
    use crate::node::{ElementKind, Marks};

    fn doc(children: Vec<Node>) -> Document {
        Document::new(children)
    }

    fn at(path: Path, offset: usize) -> Range {
        Range::collapsed(Point::new(path, offset))
    }

    #[test]
    fn split_text_moves_caret_at_split_point_into_new_leaf() {
        let mut d = doc(vec![Node::paragraph("hello")]);
        let mut sel = at(vec![0, 0], 2);
        apply_op_to(
            &mut d,
            &mut sel,
            Op::SplitNode {
                path: vec![0, 0],
                position: 2,
            },
        )
        .unwrap();
        assert_eq!(sel, at(vec![0, 1], 0));
        assert_eq!(d.children[0].string(), "hello");
    }

    #[test]
    fn merge_text_shifts_offsets_by_previous_length() {
        let mut d = doc(vec![Node::element(
            ElementKind::Paragraph,
            vec![Node::text("ab"), Node::text("cd")],
        )]);
        let mut sel = at(vec![0, 1], 1);
        apply_op_to(&mut d, &mut sel, Op::MergeNode { path: vec![0, 1] }).unwrap();
        assert_eq!(sel, at(vec![0, 0], 3));
        assert_eq!(d.leaf(&[0, 0]).map(|t| t.text.as_str()), Some("abcd"));
    }

    #[test]
    fn wrap_and_unwrap_keep_points_on_the_same_leaf() {
        let mut d = doc(vec![Node::paragraph("a"), Node::paragraph("b"), Node::paragraph("c")]);
        let mut sel = Range::new(Point::new(vec![1, 0], 1), Point::new(vec![2, 0], 0));
        apply_op_to(
            &mut d,
            &mut sel,
            Op::WrapNodes {
                parent: vec![],
                range: 0..2,
                wrapper: Element::new(ElementKind::BulletedList, Vec::new()),
            },
        )
        .unwrap();
        assert_eq!(sel.anchor.path, vec![0, 1, 0]);
        assert_eq!(sel.focus.path, vec![1, 0]);

        apply_op_to(&mut d, &mut sel, Op::UnwrapNode { path: vec![0] }).unwrap();
        assert_eq!(sel.anchor.path, vec![1, 0]);
        assert_eq!(sel.focus.path, vec![2, 0]);
    }

    #[test]
    fn removing_the_focused_leaf_falls_back_to_previous_leaf_end() {
        let mut d = doc(vec![Node::paragraph("one"), Node::paragraph("two")]);
        let mut sel = at(vec![1, 0], 2);
        apply_op_to(&mut d, &mut sel, Op::RemoveNode { path: vec![1] }).unwrap();
        assert_eq!(sel, at(vec![0, 0], 3));
    }

    #[test]
    fn failed_transaction_leaves_document_untouched() {
        let mut editor = Editor::new(doc(vec![Node::paragraph("keep")]));
        let before = editor.doc().clone();
        let err = editor
            .apply(Transaction::new(vec![
                Op::InsertText {
                    path: vec![0, 0],
                    offset: 0,
                    text: "x".into(),
                },
                Op::RemoveNode { path: vec![7] },
            ]))
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidPath(_)));
        assert_eq!(editor.doc(), &before);
    }

    #[test]
    fn set_marks_replaces_leaf_marks() {
        let mut d = doc(vec![Node::paragraph("x")]);
        let mut sel = at(vec![0, 0], 0);
        let marks = Marks::default().with(crate::node::Mark::Bold, true);
        apply_op_to(&mut d, &mut sel, Op::SetMarks { path: vec![0, 0], marks }).unwrap();
        assert!(d.leaf(&[0, 0]).unwrap().marks.bold);
    }

    #[test]
    fn points_inside_a_void_move_after_it() {
        let d = doc(vec![Node::element(
            ElementKind::Paragraph,
            vec![
                Node::text("a"),
                Element::mention("ann", None).into(),
                Node::text("b"),
            ],
        )]);
        let sel = normalize_selection(&d, &at(vec![0, 1, 0], 0));
        assert_eq!(sel, at(vec![0, 2], 0));
    }

    #[test]
    fn child_path_appends() {
        assert_eq!(child_path(&[1, 2], 3), vec![1, 2, 3]);
    }
}
