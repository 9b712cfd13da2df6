use pretty_assertions::assert_eq;
use rich_editor_core::{
    Document, Editor, EditorConfig, EditorError, Element, ElementKind, Node, NormalizePass,
    Normalizer, Op, Transaction,
};

fn item(text: &str) -> Node {
    Node::element(ElementKind::ListItem, vec![Node::text(text)])
}

#[test]
fn empty_document_gets_an_empty_paragraph() {
    let editor = Editor::new(Document::default());
    assert_eq!(editor.doc(), &Document::new(vec![Node::paragraph("")]));
}

#[test]
fn root_text_is_wrapped_in_a_paragraph() {
    let editor = Editor::new(Document::new(vec![Node::text("loose")]));
    assert_eq!(editor.doc(), &Document::new(vec![Node::paragraph("loose")]));
}

#[test]
fn list_children_are_coerced_and_adjacent_lists_merge() {
    let editor = Editor::new(Document::new(vec![
        Node::element(ElementKind::BulletedList, vec![Node::paragraph("a")]),
        Node::element(ElementKind::BulletedList, vec![item("b")]),
        Node::element(ElementKind::NumberedList, vec![item("c")]),
    ]));

    assert_eq!(
        editor.doc(),
        &Document::new(vec![
            Node::element(ElementKind::BulletedList, vec![item("a"), item("b")]),
            Node::element(ElementKind::NumberedList, vec![item("c")]),
        ])
    );
}

#[test]
fn empty_lists_are_removed_and_orphan_items_demoted() {
    let editor = Editor::new(Document::new(vec![
        Node::element(ElementKind::NumberedList, Vec::new()),
        item("orphan"),
    ]));

    assert_eq!(editor.doc(), &Document::new(vec![Node::paragraph("orphan")]));
}

#[test]
fn blocks_nested_in_a_paragraph_are_lifted() {
    let editor = Editor::new(Document::new(vec![Node::element(
        ElementKind::Paragraph,
        vec![Node::text("a"), Node::paragraph("b")],
    )]));

    assert_eq!(editor.doc(), &Document::new(vec![Node::paragraph("ab")]));
}

#[test]
fn mentions_keep_one_empty_text_child_and_spacers() {
    let mention = Element::new(ElementKind::Mention, vec![Node::text("junk"), Node::text("more")])
        .with_attr("value", "Ann");
    let editor = Editor::new(Document::new(vec![Node::element(
        ElementKind::Paragraph,
        vec![mention.into()],
    )]));

    let expected = Document::new(vec![Node::element(
        ElementKind::Paragraph,
        vec![
            Node::text(""),
            Element::mention("Ann", None).into(),
            Node::text(""),
        ],
    )]);
    assert_eq!(editor.doc(), &expected);
}

#[test]
fn todo_and_toggle_blocks_get_default_flags() {
    let editor = Editor::new(Document::new(vec![
        Node::element(ElementKind::TodoListItem, vec![Node::text("t")]),
        Node::element(ElementKind::Toggle, vec![Node::text("g")]),
    ]));

    assert_eq!(editor.doc().element(&[0]).unwrap().checked(), Some(false));
    assert_eq!(editor.doc().element(&[1]).unwrap().collapsed(), Some(false));
}

#[test]
fn empty_elements_get_a_text_leaf() {
    let editor = Editor::new(Document::new(vec![Node::element(ElementKind::H2, Vec::new())]));
    assert_eq!(
        editor.doc(),
        &Document::new(vec![Node::element(ElementKind::H2, vec![Node::text("")])])
    );
}

struct AlwaysDirty;

impl NormalizePass for AlwaysDirty {
    fn id(&self) -> &'static str {
        "test.always_dirty"
    }

    fn run(&self, _doc: &Document) -> Vec<Op> {
        vec![Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "x".into(),
        }]
    }
}

#[test]
fn custom_passes_run_after_the_built_in_ones() {
    let mut normalizer = Normalizer::default();
    normalizer.push(Box::new(AlwaysDirty));
    let doc = Document::new(vec![Node::paragraph("")]);

    let (id, ops) = normalizer.next_fix(&doc).unwrap();
    assert_eq!(id, "test.always_dirty");
    assert_eq!(ops.len(), 1);

    let (id, _) = normalizer.next_fix(&Document::default()).unwrap();
    assert_eq!(id, "core.ensure_non_empty_document");
}

#[test]
fn non_converging_normalization_rejects_the_transaction() {
    let config = EditorConfig {
        max_normalize_iterations: 1,
        ..EditorConfig::default()
    };
    // Two fixes are needed: wrap the root text, then merge the leaves.
    let loose = Document::new(vec![Node::text("a"), Node::text("b")]);
    let mut editor = Editor::with_config(loose.clone(), &config);
    assert_eq!(editor.doc(), &loose);

    let tx = Transaction::new(vec![Op::InsertText {
        path: vec![0],
        offset: 1,
        text: "c".into(),
    }]);
    assert_eq!(editor.apply(tx), Err(EditorError::NormalizeDidNotConverge(1)));
    assert_eq!(editor.doc(), &loose);
}
