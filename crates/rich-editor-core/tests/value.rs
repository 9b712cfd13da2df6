use anyhow::Result;
use pretty_assertions::assert_eq;
use rich_editor_core::{
    ConfigError, Document, Editor, EditorConfig, EditorError, Element, ElementKind, ImportError,
    Mark, Marks, MemoryStore, Node, Op, Session, Transaction, default_value, from_json, to_json,
};

#[test]
fn default_value_survives_export_and_import() -> Result<()> {
    let doc = default_value();
    let json = to_json(&doc)?;
    assert!(json.trim_start().starts_with('['));
    assert_eq!(from_json(&json)?, doc);
    Ok(())
}

#[test]
fn rich_documents_survive_export_and_import() -> Result<()> {
    let bold = Marks::default().with(Mark::Bold, true);
    let doc = Document::new(vec![
        Node::element(
            ElementKind::Paragraph,
            vec![
                Node::marked("bold", bold),
                Element::link("https://example.com", vec![Node::text("site")]).into(),
                Node::text(" hi "),
                Element::mention("Alice", Some("0")).into(),
                Node::text(""),
            ],
        ),
        Element::new(
            ElementKind::NumberedList,
            vec![Node::element(ElementKind::ListItem, vec![Node::text("third")])],
        )
        .with_attr("listStart", 3)
        .with_attr("listStyleType", "decimal")
        .into(),
        Element::new(ElementKind::TodoListItem, vec![Node::text("done")])
            .with_attr("checked", true)
            .with_attr("indent", 1)
            .into(),
    ]);
    let editor = Editor::new(doc);

    let restored = from_json(&to_json(editor.doc())?)?;
    assert_eq!(restored, *editor.doc());

    let Some(Node::Element(mention)) = restored.node(&[0, 3]) else {
        panic!("expected the mention");
    };
    assert_eq!((mention.value(), mention.key()), (Some("Alice"), Some("0")));
    assert_eq!(restored.element(&[0, 1]).and_then(|l| l.url()), Some("https://example.com"));

    let list = restored.element(&[1]).expect("numbered list");
    assert_eq!(list.list_start(), Some(3));
    assert_eq!(list.list_style_type(), Some("decimal"));

    let todo = restored.element(&[2]).expect("todo");
    assert_eq!((todo.checked(), todo.indent()), (Some(true), Some(1)));
    Ok(())
}

#[test]
fn starter_document_has_a_callout_icon() {
    let doc = default_value();
    let icons: Vec<_> = doc
        .children
        .iter()
        .filter_map(Node::as_element)
        .filter_map(|el| el.icon())
        .collect();
    assert_eq!(icons, vec!["💡"]);
}

#[test]
fn failed_import_keeps_the_current_document() -> Result<()> {
    let mut session = Session::with_document(
        EditorConfig::default(),
        Document::new(vec![Node::paragraph("keep me")]),
    )?;

    let err = session.import_json("{not json").unwrap_err();
    assert_eq!(err.to_string(), "Failed to parse JSON. Please check the format.");

    let err = session.import_json(r#"[{"text":"loose"}]"#).unwrap_err();
    assert!(matches!(err, ImportError::Invalid { .. }));

    assert_eq!(
        session.editor().doc(),
        &Document::new(vec![Node::paragraph("keep me")])
    );
    Ok(())
}

#[test]
fn successful_import_replaces_the_document() -> Result<()> {
    let mut session = Session::with_document(
        EditorConfig::default(),
        Document::new(vec![Node::paragraph("old")]),
    )?;
    let json = to_json(&Document::new(vec![Node::paragraph("new")]))?;

    session.import_json(&json)?;
    assert_eq!(session.editor().doc(), &Document::new(vec![Node::paragraph("new")]));
    assert_eq!(from_json(&session.export_json()?)?, *session.editor().doc());
    Ok(())
}

#[test]
fn edits_are_saved_to_the_store() -> Result<()> {
    let store = MemoryStore::new();
    let mut session = Session::with_store(EditorConfig::default(), Box::new(store.clone()))?;
    assert_eq!(session.editor().doc(), Editor::new(default_value()).doc());
    assert_eq!(store.get(), None);

    session.type_text("x");

    let saved = store.get().expect("document saved");
    assert_eq!(from_json(&saved)?, *session.editor().doc());

    let reopened = Session::with_store(EditorConfig::default(), Box::new(store.clone()))?;
    assert_eq!(reopened.editor().doc(), session.editor().doc());
    Ok(())
}

#[test]
fn unreadable_store_falls_back_to_the_starter_document() -> Result<()> {
    let store = MemoryStore::with_value("garbage");
    let session = Session::with_store(EditorConfig::default(), Box::new(store))?;
    assert_eq!(session.editor().doc(), Editor::new(default_value()).doc());
    Ok(())
}

#[test]
fn preview_is_read_only() -> Result<()> {
    let session = Session::with_document(
        EditorConfig::default(),
        Document::new(vec![Node::paragraph("shown")]),
    )?;
    let mut preview = session.preview()?;
    assert!(preview.is_read_only());

    preview.insert_text("typed", None);
    assert_eq!(preview.doc(), &Document::new(vec![Node::paragraph("shown")]));

    let tx = Transaction::new(vec![Op::InsertText {
        path: vec![0, 0],
        offset: 0,
        text: "x".into(),
    }]);
    assert_eq!(preview.apply(tx), Err(EditorError::ReadOnly));

    preview.replace_document(Document::new(vec![Node::paragraph("swapped")]));
    assert_eq!(preview.doc(), &Document::new(vec![Node::paragraph("shown")]));
    Ok(())
}

#[test]
fn invalid_configs_are_rejected() {
    let doc = || Document::new(vec![Node::paragraph("")]);

    let same = EditorConfig::default().mention_trigger('/');
    assert!(matches!(
        Session::with_document(same, doc()),
        Err(ConfigError::DuplicateTrigger('/'))
    ));

    let letter = EditorConfig::default().slash_trigger('a');
    assert!(matches!(
        Session::with_document(letter, doc()),
        Err(ConfigError::Trigger('a'))
    ));

    let pattern = EditorConfig::default().trigger_previous_char("(");
    assert!(matches!(
        Session::with_document(pattern, doc()),
        Err(ConfigError::Pattern(_))
    ));
}
