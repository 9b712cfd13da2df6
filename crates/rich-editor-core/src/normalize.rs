//! Structural normalization.
//!
//! Each pass inspects the document and returns the ops that fix every
//! violation of one rule. Passes visit elements bottom-up and last child
//! first, so their ops stay valid when applied in order. The editor runs the
//! first pass that reports work, then starts over until no pass does.

use crate::location::child_path;
use crate::node::{ChildConstraint, Document, Element, ElementKind, Node};
use crate::ops::{NodePatch, Op};

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document) -> Vec<Op>;
}

pub struct Normalizer {
    passes: Vec<Box<dyn NormalizePass>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            passes: vec![
                Box::new(EnsureNonEmptyDocument),
                Box::new(WrapRootInlines),
                Box::new(RemoveEmptyLists),
                Box::new(NormalizeListChildren),
                Box::new(DemoteOrphanListItems),
                Box::new(LiftNestedBlocks),
                Box::new(EnsureElementChildren),
                Box::new(EnsureInlineSpacers),
                Box::new(MergeAdjacentTextLeaves),
                Box::new(MergeAdjacentLists),
                Box::new(DefaultKindAttrs),
            ],
        }
    }
}

impl Normalizer {
    pub fn passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.passes
    }

    pub fn push(&mut self, pass: Box<dyn NormalizePass>) {
        self.passes.push(pass);
    }

    /// Ops of the first pass with something to fix.
    pub fn next_fix(&self, doc: &Document) -> Option<(&'static str, Vec<Op>)> {
        self.passes.iter().find_map(|pass| {
            let ops = pass.run(doc);
            (!ops.is_empty()).then(|| (pass.id(), ops))
        })
    }

    pub fn is_normalized(&self, doc: &Document) -> bool {
        self.next_fix(doc).is_none()
    }
}

/// Visits every element bottom-up, last child first. `parent` is `None` at the root.
fn visit_rev(doc: &Document, f: &mut dyn FnMut(&Element, &[usize], Option<&Element>)) {
    fn walk(
        children: &[Node],
        path: &mut Vec<usize>,
        parent: Option<&Element>,
        f: &mut dyn FnMut(&Element, &[usize], Option<&Element>),
    ) {
        for (ix, node) in children.iter().enumerate().rev() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            walk(&el.children, path, Some(el), f);
            f(el, path, parent);
            path.pop();
        }
    }

    walk(&doc.children, &mut Vec::new(), None, f);
}

fn holds_inlines(el: &Element) -> bool {
    el.spec().children == ChildConstraint::InlineOnly && !el.kind.is_void()
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        if !doc.children.is_empty() {
            return Vec::new();
        }
        vec![Op::InsertNode {
            path: vec![0],
            node: Node::paragraph(""),
        }]
    }
}

/// Runs of text or inline elements at the root become paragraphs.
struct WrapRootInlines;

impl NormalizePass for WrapRootInlines {
    fn id(&self) -> &'static str {
        "core.wrap_root_inlines"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        let children = &doc.children;
        let mut ix = children.len();
        while ix > 0 {
            ix -= 1;
            if !children[ix].is_inline() {
                continue;
            }
            let end = ix + 1;
            while ix > 0 && children[ix - 1].is_inline() {
                ix -= 1;
            }
            ops.push(Op::WrapNodes {
                parent: Vec::new(),
                range: ix..end,
                wrapper: Element::new(ElementKind::Paragraph, Vec::new()),
            });
        }
        ops
    }
}

struct RemoveEmptyLists;

impl NormalizePass for RemoveEmptyLists {
    fn id(&self) -> &'static str {
        "list.remove_empty"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        visit_rev(doc, &mut |el, path, _| {
            if el.kind.is_list() && el.children.is_empty() {
                ops.push(Op::RemoveNode {
                    path: path.to_vec(),
                });
            }
        });
        ops
    }
}

/// A list holds only list items: inline runs get wrapped, nested lists get
/// lifted and any other block becomes a list item.
struct NormalizeListChildren;

impl NormalizePass for NormalizeListChildren {
    fn id(&self) -> &'static str {
        "list.normalize_children"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        visit_rev(doc, &mut |el, path, _| {
            if !el.kind.is_list() {
                return;
            }
            let children = &el.children;
            let mut ix = children.len();
            while ix > 0 {
                ix -= 1;
                match &children[ix] {
                    child if child.is_inline() => {
                        let end = ix + 1;
                        while ix > 0 && children[ix - 1].is_inline() {
                            ix -= 1;
                        }
                        ops.push(Op::WrapNodes {
                            parent: path.to_vec(),
                            range: ix..end,
                            wrapper: Element::new(ElementKind::ListItem, Vec::new()),
                        });
                    }
                    Node::Element(child) if child.kind == ElementKind::ListItem => {}
                    Node::Element(child) if child.kind.is_list() => {
                        ops.push(Op::UnwrapNode {
                            path: child_path(path, ix),
                        });
                    }
                    Node::Element(_) | Node::Text(_) => {
                        ops.push(Op::SetNode {
                            path: child_path(path, ix),
                            patch: NodePatch::kind(ElementKind::ListItem),
                        });
                    }
                }
            }
        });
        ops
    }
}

struct DemoteOrphanListItems;

impl NormalizePass for DemoteOrphanListItems {
    fn id(&self) -> &'static str {
        "list.demote_orphan_items"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        visit_rev(doc, &mut |el, path, parent| {
            let in_list = parent.is_some_and(|p| p.kind.is_list());
            if el.kind == ElementKind::ListItem && !in_list {
                ops.push(Op::SetNode {
                    path: path.to_vec(),
                    patch: NodePatch::kind(ElementKind::Paragraph),
                });
            }
        });
        ops
    }
}

/// Blocks nested in inline-only content are replaced by their children.
struct LiftNestedBlocks;

impl NormalizePass for LiftNestedBlocks {
    fn id(&self) -> &'static str {
        "core.lift_nested_blocks"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        visit_rev(doc, &mut |el, path, _| {
            if el.spec().children != ChildConstraint::InlineOnly {
                return;
            }
            for (ix, child) in el.children.iter().enumerate().rev() {
                let Node::Element(child) = child else {
                    continue;
                };
                let nested_link = el.kind == ElementKind::Link && child.kind == ElementKind::Link;
                if !child.kind.is_inline() || nested_link {
                    ops.push(Op::UnwrapNode {
                        path: child_path(path, ix),
                    });
                }
            }
        });
        ops
    }
}

/// Every element has a child; a mention has exactly one empty text leaf.
struct EnsureElementChildren;

impl NormalizePass for EnsureElementChildren {
    fn id(&self) -> &'static str {
        "core.ensure_element_children"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        visit_rev(doc, &mut |el, path, _| {
            if el.kind.is_void() {
                let valid = matches!(el.children.as_slice(), [Node::Text(t)] if t.text.is_empty());
                if valid {
                    return;
                }
                for ix in (0..el.children.len()).rev() {
                    ops.push(Op::RemoveNode {
                        path: child_path(path, ix),
                    });
                }
            } else if !el.children.is_empty() || el.kind.is_list() {
                return;
            }
            ops.push(Op::InsertNode {
                path: child_path(path, 0),
                node: Node::text(""),
            });
        });
        ops
    }
}

/// Inline elements always have a text leaf on both sides.
struct EnsureInlineSpacers;

impl NormalizePass for EnsureInlineSpacers {
    fn id(&self) -> &'static str {
        "inline.ensure_spacers"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        visit_rev(doc, &mut |el, path, _| {
            if !holds_inlines(el) {
                return;
            }
            let children = &el.children;
            for ix in (0..children.len()).rev() {
                if !matches!(&children[ix], Node::Element(child) if child.kind.is_inline()) {
                    continue;
                }
                if !matches!(children.get(ix + 1), Some(Node::Text(_))) {
                    ops.push(Op::InsertNode {
                        path: child_path(path, ix + 1),
                        node: Node::text(""),
                    });
                }
                if ix == 0 || !matches!(children[ix - 1], Node::Text(_)) {
                    ops.push(Op::InsertNode {
                        path: child_path(path, ix),
                        node: Node::text(""),
                    });
                }
            }
        });
        ops
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        visit_rev(doc, &mut |el, path, _| {
            if !holds_inlines(el) {
                return;
            }
            for ix in (1..el.children.len()).rev() {
                let (Node::Text(left), Node::Text(right)) = (&el.children[ix - 1], &el.children[ix])
                else {
                    continue;
                };
                if left.marks == right.marks {
                    ops.push(Op::MergeNode {
                        path: child_path(path, ix),
                    });
                }
            }
        });
        ops
    }
}

struct MergeAdjacentLists;

impl NormalizePass for MergeAdjacentLists {
    fn id(&self) -> &'static str {
        "list.merge_adjacent"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        fn merge_siblings(children: &[Node], path: &[usize], ops: &mut Vec<Op>) {
            for ix in (1..children.len()).rev() {
                let (Node::Element(left), Node::Element(right)) = (&children[ix - 1], &children[ix])
                else {
                    continue;
                };
                if left.kind.is_list() && left.kind == right.kind {
                    ops.push(Op::MergeNode {
                        path: child_path(path, ix),
                    });
                }
            }
        }

        let mut ops = Vec::new();
        visit_rev(doc, &mut |el, path, _| {
            if el.spec().children == ChildConstraint::BlockOnly {
                merge_siblings(&el.children, path, &mut ops);
            }
        });
        merge_siblings(&doc.children, &[], &mut ops);
        ops
    }
}

/// Todo items carry `checked`, toggles carry `collapsed`.
struct DefaultKindAttrs;

impl NormalizePass for DefaultKindAttrs {
    fn id(&self) -> &'static str {
        "core.default_kind_attrs"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        visit_rev(doc, &mut |el, path, _| {
            let key = match el.kind {
                ElementKind::TodoListItem => "checked",
                ElementKind::Toggle => "collapsed",
                _ => return,
            };
            if el.attrs.get(key).is_some_and(serde_json::Value::is_boolean) {
                return;
            }
            ops.push(Op::SetNode {
                path: path.to_vec(),
                patch: NodePatch::default().set(key, false),
            });
        });
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_passes_have_unique_ids() {
        let normalizer = Normalizer::default();
        let mut ids: Vec<_> = normalizer.passes().iter().map(|p| p.id()).collect();
        let len = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), len);
    }

    #[test]
    fn merge_ops_are_emitted_right_to_left() {
        let doc = Document::new(vec![Node::element(
            ElementKind::Paragraph,
            vec![Node::text("a"), Node::text("b"), Node::text("c")],
        )]);
        let ops = MergeAdjacentTextLeaves.run(&doc);
        assert_eq!(
            ops,
            vec![
                Op::MergeNode { path: vec![0, 2] },
                Op::MergeNode { path: vec![0, 1] },
            ]
        );
    }

    #[test]
    fn normalized_empty_document_is_one_empty_paragraph() {
        let normalizer = Normalizer::default();
        let doc = Document::default();
        let (id, ops) = normalizer.next_fix(&doc).unwrap();
        assert_eq!(id, "core.ensure_non_empty_document");
        assert_eq!(ops.len(), 1);
    }
}
