use pretty_assertions::assert_eq;
use rich_editor_core::{
    Direction, Document, Edge, Editor, ElementKind, Location, MatchMode, Node, NodeOptions,
    NodePatch, Point, Range,
};

fn caret(path: Vec<usize>, offset: usize) -> Range {
    Range::collapsed(Point::new(path, offset))
}

fn paragraphs(texts: &[&str]) -> Document {
    Document::new(texts.iter().map(|t| Node::paragraph(*t)).collect())
}

#[test]
fn insert_text_replaces_an_expanded_selection() {
    let mut editor = Editor::with_selection(
        paragraphs(&["hello"]),
        Range::new(Point::new(vec![0, 0], 1), Point::new(vec![0, 0], 4)),
    );

    editor.insert_text("i", None);

    assert_eq!(editor.doc(), &paragraphs(&["hio"]));
    assert_eq!(editor.selection(), &caret(vec![0, 0], 2));
}

#[test]
fn collapsed_delete_removes_one_character_forward() {
    let mut editor = Editor::with_selection(paragraphs(&["abc"]), caret(vec![0, 0], 1));

    editor.delete(None);

    assert_eq!(editor.doc(), &paragraphs(&["ac"]));
    assert_eq!(editor.selection(), &caret(vec![0, 0], 1));
}

#[test]
fn delete_across_blocks_merges_them() {
    let mut editor = Editor::with_selection(
        paragraphs(&["ab", "cd"]),
        Range::new(Point::new(vec![0, 0], 1), Point::new(vec![1, 0], 1)),
    );

    editor.delete(None);

    assert_eq!(editor.doc(), &paragraphs(&["ad"]));
    assert_eq!(editor.selection(), &caret(vec![0, 0], 1));
}

#[test]
fn stale_locations_are_ignored() {
    let mut editor = Editor::new(paragraphs(&["keep"]));
    let before = editor.doc().clone();

    editor.delete(Some(Location::Range(Range::new(
        Point::new(vec![4, 0], 0),
        Point::new(vec![4, 0], 2),
    ))));
    editor.insert_text("x", Some(Location::Point(Point::new(vec![0, 3], 0))));
    editor.select(Point::new(vec![9, 9], 0));

    assert_eq!(editor.doc(), &before);
    assert_eq!(editor.selection(), &caret(vec![0, 0], 0));
}

#[test]
fn move_and_collapse_selection() {
    let mut editor = Editor::with_selection(paragraphs(&["abc", "de"]), caret(vec![0, 0], 0));

    editor.move_selection(2, Direction::Forward);
    assert_eq!(editor.selection(), &caret(vec![0, 0], 2));

    editor.move_selection(2, Direction::Forward);
    assert_eq!(editor.selection(), &caret(vec![1, 0], 0));

    editor.move_selection(1, Direction::Backward);
    assert_eq!(editor.selection(), &caret(vec![0, 0], 3));

    editor.select(Range::new(Point::new(vec![1, 0], 2), Point::new(vec![0, 0], 1)));
    editor.collapse(Edge::Start);
    assert_eq!(editor.selection(), &caret(vec![0, 0], 1));
}

#[test]
fn select_path_spans_the_whole_node() {
    let mut editor = Editor::new(paragraphs(&["abc", "de"]));

    editor.select(Location::Path(vec![1]));

    assert_eq!(
        editor.selection(),
        &Range::new(Point::new(vec![1, 0], 0), Point::new(vec![1, 0], 2))
    );
}

#[test]
fn insert_block_nodes_after_the_current_block() {
    let mut editor = Editor::with_selection(paragraphs(&["a", "c"]), caret(vec![0, 0], 1));

    editor.insert_nodes(vec![Node::paragraph("b")], None);

    assert_eq!(editor.doc(), &paragraphs(&["a", "b", "c"]));
    assert_eq!(editor.selection(), &caret(vec![1, 0], 1));
}

#[test]
fn nodes_honours_match_mode() {
    let doc = Document::new(vec![Node::element(
        ElementKind::BulletedList,
        vec![
            Node::element(ElementKind::ListItem, vec![Node::text("a")]),
            Node::element(ElementKind::ListItem, vec![Node::text("b")]),
        ],
    )]);
    let editor = Editor::with_selection(doc, caret(vec![0, 1, 0], 0));

    assert_eq!(editor.nodes(&NodeOptions::new()), vec![vec![0, 1]]);
    assert_eq!(
        editor.nodes(&NodeOptions::new().mode(MatchMode::Highest)),
        vec![vec![0]]
    );
    assert_eq!(
        editor.nodes(&NodeOptions::new().mode(MatchMode::All)),
        vec![vec![0], vec![0, 1]]
    );
}

#[test]
fn set_and_unset_attributes() {
    let mut editor = Editor::new(paragraphs(&["a"]));

    editor.set_nodes(NodePatch::default().set("indent", 2), NodeOptions::new());
    assert_eq!(editor.doc().element(&[0]).and_then(|el| el.indent()), Some(2));

    editor.unset_nodes(&["indent"], NodeOptions::new());
    assert_eq!(editor.doc(), &paragraphs(&["a"]));
}

#[test]
fn unwrap_with_split_lifts_only_the_covered_item() {
    let item = |t: &str| Node::element(ElementKind::ListItem, vec![Node::text(t)]);
    let doc = Document::new(vec![Node::element(
        ElementKind::BulletedList,
        vec![item("a"), item("b"), item("c")],
    )]);
    let mut editor = Editor::with_selection(doc, caret(vec![0, 1, 0], 0));

    editor.unwrap_lists();

    let expected = Document::new(vec![
        Node::element(ElementKind::BulletedList, vec![item("a")]),
        Node::paragraph("b"),
        Node::element(ElementKind::BulletedList, vec![item("c")]),
    ]);
    assert_eq!(editor.doc(), &expected);
    assert_eq!(editor.selection(), &caret(vec![1, 0], 0));
}

#[test]
fn batches_normalize_once_at_the_end() {
    let mut editor = Editor::with_selection(paragraphs(&["ab"]), caret(vec![0, 0], 2));

    editor.without_normalizing(|editor| {
        editor.toggle_mark(rich_editor_core::Mark::Bold);
        editor.insert_text("c", None);
        assert!(editor.is_normalizing_deferred());
    });

    assert!(!editor.is_normalizing_deferred());
    assert!(editor.normalizer().is_normalized(editor.doc()));
    let Node::Element(p) = &editor.doc().children[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(p.children.len(), 2);
    assert!(p.children[1].as_text().is_some_and(|t| t.marks.bold && t.text == "c"));
}
