use anyhow::Result;
use pretty_assertions::assert_eq;
use rich_editor_core::{
    AutoformatAction, AutoformatRule, Document, EditorConfig, ElementKind, Node, Point, Range,
    Session,
};

fn session_with(doc: Document) -> Result<Session> {
    Ok(Session::with_document(EditorConfig::default(), doc)?)
}

fn typed(text: &str) -> Result<Session> {
    let mut session = session_with(Document::new(vec![Node::paragraph("")]))?;
    session.type_text(text);
    Ok(session)
}

fn item(kind: ElementKind, text: &str) -> Node {
    Node::element(kind, vec![Node::text(text)])
}

#[test]
fn hash_space_makes_a_heading() -> Result<()> {
    let session = typed("# ")?;
    assert_eq!(
        session.editor().doc(),
        &Document::new(vec![item(ElementKind::H1, "")])
    );

    let session = typed("### Title")?;
    assert_eq!(
        session.editor().doc(),
        &Document::new(vec![item(ElementKind::H3, "Title")])
    );
    Ok(())
}

#[test]
fn quote_and_bullet_shortcuts() -> Result<()> {
    let session = typed("> quoted")?;
    assert_eq!(
        session.editor().doc(),
        &Document::new(vec![item(ElementKind::Blockquote, "quoted")])
    );

    for marker in ["- ", "* "] {
        let session = typed(marker)?;
        assert_eq!(
            session.editor().doc(),
            &Document::new(vec![Node::element(
                ElementKind::BulletedList,
                vec![item(ElementKind::ListItem, "")],
            )])
        );
    }
    Ok(())
}

#[test]
fn numbered_shortcut_seeds_the_start() -> Result<()> {
    let session = typed("1. ")?;
    assert_eq!(
        session.editor().doc(),
        &Document::new(vec![Node::element(
            ElementKind::NumberedList,
            vec![item(ElementKind::ListItem, "")],
        )])
    );

    let session = typed("3) ")?;
    let list = session.editor().doc().element(&[0]).unwrap();
    assert_eq!(list.kind, ElementKind::NumberedList);
    assert_eq!(list.list_start(), Some(3));
    Ok(())
}

#[test]
fn todo_shortcuts() -> Result<()> {
    let session = typed("[] ")?;
    let todo = session.editor().doc().element(&[0]).unwrap();
    assert_eq!(todo.kind, ElementKind::TodoListItem);
    assert_eq!(todo.checked(), Some(false));

    let session = typed("[x] done")?;
    let todo = session.editor().doc().element(&[0]).unwrap();
    assert_eq!(todo.checked(), Some(true));
    assert_eq!(todo.string(), "done");
    Ok(())
}

#[test]
fn only_fires_at_the_start_of_a_block() -> Result<()> {
    let session = typed("a # ")?;
    assert_eq!(
        session.editor().doc(),
        &Document::new(vec![Node::paragraph("a # ")])
    );
    Ok(())
}

#[test]
fn skipped_inside_code_blocks() -> Result<()> {
    let mut session = session_with(Document::new(vec![item(ElementKind::CodeBlock, "")]))?;
    session.type_text("# ");
    assert_eq!(
        session.editor().doc(),
        &Document::new(vec![item(ElementKind::CodeBlock, "# ")])
    );
    Ok(())
}

#[test]
fn skipped_when_the_block_already_has_the_kind() -> Result<()> {
    let list = Node::element(
        ElementKind::BulletedList,
        vec![item(ElementKind::ListItem, "")],
    );
    let mut session = session_with(Document::new(vec![list]))?;
    session.update(|editor| editor.select(Range::collapsed(Point::new(vec![0, 0, 0], 0))));
    session.type_text("- ");

    let list = session.editor().doc().element(&[0]).unwrap();
    assert_eq!(list.kind, ElementKind::BulletedList);
    assert_eq!(list.string(), "- ");
    Ok(())
}

#[test]
fn custom_rules_replace_the_defaults() -> Result<()> {
    let config = EditorConfig::default()
        .autoformat_rules(vec![AutoformatRule::pattern(
            r"^!+$",
            AutoformatAction::Block(ElementKind::Callout),
        )])
        .autoformat_trigger(' ');
    let mut session = Session::with_document(config, Document::new(vec![Node::paragraph("")]))?;

    session.type_text("!! tip");
    assert_eq!(
        session.editor().doc(),
        &Document::new(vec![item(ElementKind::Callout, "tip")])
    );

    session.update(|editor| editor.insert_break());
    session.type_text("# ");
    let next = session.editor().doc().element(&[1]).unwrap();
    assert_ne!(next.kind, ElementKind::H1);
    assert_eq!(next.string(), "# ");
    Ok(())
}
