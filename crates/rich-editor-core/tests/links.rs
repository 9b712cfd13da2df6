use pretty_assertions::assert_eq;
use rich_editor_core::{Document, Editor, Element, ElementKind, Node, Point, Range};

#[test]
fn wrap_link_at_a_caret_inserts_the_url_as_text() {
    let mut editor = Editor::with_selection(
        Document::new(vec![Node::paragraph("go ")]),
        Range::collapsed(Point::new(vec![0, 0], 3)),
    );

    editor.wrap_link("https://example.com");

    let expected = Document::new(vec![Node::element(
        ElementKind::Paragraph,
        vec![
            Node::text("go "),
            Element::link("https://example.com", vec![Node::text("https://example.com")]).into(),
            Node::text(""),
        ],
    )]);
    assert_eq!(editor.doc(), &expected);
    assert_eq!(editor.selection(), &Range::collapsed(Point::new(vec![0, 2], 0)));
}

#[test]
fn wrap_link_over_a_selection_then_unwrap() {
    let mut editor = Editor::with_selection(
        Document::new(vec![Node::paragraph("hello world")]),
        Range::new(Point::new(vec![0, 0], 6), Point::new(vec![0, 0], 11)),
    );

    editor.wrap_link("https://w.org");

    let expected = Document::new(vec![Node::element(
        ElementKind::Paragraph,
        vec![
            Node::text("hello "),
            Element::link("https://w.org", vec![Node::text("world")]).into(),
            Node::text(""),
        ],
    )]);
    assert_eq!(editor.doc(), &expected);
    assert!(editor.selection().is_collapsed());
    assert_eq!(editor.active_link().as_deref(), Some("https://w.org"));

    editor.unwrap_link();

    assert_eq!(editor.doc(), &Document::new(vec![Node::paragraph("hello world")]));
    assert_eq!(editor.active_link(), None);
}

#[test]
fn wrapping_inside_a_link_replaces_it() {
    let doc = Document::new(vec![Node::element(
        ElementKind::Paragraph,
        vec![
            Node::text("a "),
            Element::link("https://old", vec![Node::text("site")]).into(),
            Node::text(""),
        ],
    )]);
    let mut editor = Editor::with_selection(
        doc,
        Range::new(Point::new(vec![0, 1, 0], 0), Point::new(vec![0, 1, 0], 4)),
    );

    editor.wrap_link("https://new");

    let expected = Document::new(vec![Node::element(
        ElementKind::Paragraph,
        vec![
            Node::text("a "),
            Element::link("https://new", vec![Node::text("site")]).into(),
            Node::text(""),
        ],
    )]);
    assert_eq!(editor.doc(), &expected);
}

#[test]
fn break_inside_a_link_splits_it_across_blocks() {
    let doc = Document::new(vec![Node::element(
        ElementKind::Paragraph,
        vec![
            Node::text(""),
            Element::link("u", vec![Node::text("abcd")]).into(),
            Node::text(""),
        ],
    )]);
    let mut editor = Editor::with_selection(doc, Range::collapsed(Point::new(vec![0, 1, 0], 2)));

    editor.insert_break();

    let half = |text: &str| {
        Node::element(
            ElementKind::Paragraph,
            vec![
                Node::text(""),
                Element::link("u", vec![Node::text(text)]).into(),
                Node::text(""),
            ],
        )
    };
    assert_eq!(editor.doc(), &Document::new(vec![half("ab"), half("cd")]));
    assert_eq!(editor.selection(), &Range::collapsed(Point::new(vec![1, 1, 0], 0)));
}

#[test]
fn break_at_the_end_of_a_link_starts_unlinked_text() {
    let doc = Document::new(vec![Node::element(
        ElementKind::Paragraph,
        vec![
            Node::text("a"),
            Element::link("u", vec![Node::text("ab")]).into(),
            Node::text(""),
        ],
    )]);
    let mut editor = Editor::with_selection(
        doc.clone(),
        Range::collapsed(Point::new(vec![0, 1, 0], 2)),
    );

    editor.insert_break();
    editor.insert_text("x", None);

    let mut expected = doc.children.clone();
    expected.push(Node::paragraph("x"));
    assert_eq!(editor.doc(), &Document::new(expected));
    assert_eq!(editor.selection(), &Range::collapsed(Point::new(vec![1, 0], 1)));
}
