//! One editor instance with its menus, autoformat and persistence wired up.

use std::time::Instant;

use tracing::{debug, warn};

use crate::autoformat::Autoformat;
use crate::commands::{SLASH_EMPTY_TEXT, SlashCommand, default_slash_commands};
use crate::config::EditorConfig;
use crate::core::Editor;
use crate::error::{ConfigError, ImportError};
use crate::location::Range;
use crate::mention::{Debouncer, MENTION_EMPTY_TEXT, MentionOption};
use crate::menu::{KeyOutcome, LayoutProvider, Menu, MenuAnchor, MenuKey, OpenMenu};
use crate::node::Document;
use crate::trigger::{TriggerDetector, TriggerMatch};
use crate::value::{self, ValueStore};

pub type SearchCallback = Box<dyn FnMut(&str)>;
pub type Clock = Box<dyn Fn() -> Instant>;

#[derive(Debug, Clone, Copy)]
pub enum ActiveMenu<'a> {
    Slash(&'a OpenMenu<SlashCommand>),
    Mention(&'a OpenMenu<MentionOption>),
}

impl ActiveMenu<'_> {
    pub fn target(&self) -> &Range {
        match self {
            ActiveMenu::Slash(open) => &open.target,
            ActiveMenu::Mention(open) => &open.target,
        }
    }

    pub fn query(&self) -> &str {
        match self {
            ActiveMenu::Slash(open) => &open.query,
            ActiveMenu::Mention(open) => &open.query,
        }
    }

    pub fn active_index(&self) -> usize {
        match self {
            ActiveMenu::Slash(open) => open.active_index,
            ActiveMenu::Mention(open) => open.active_index,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ActiveMenu::Slash(open) => open.items.len(),
            ActiveMenu::Mention(open) => open.items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Session {
    editor: Editor,
    slash: Menu<SlashCommand>,
    mention: Menu<MentionOption>,
    slash_detector: TriggerDetector,
    mention_detector: TriggerDetector,
    autoformat: Autoformat,
    search: Debouncer<String>,
    on_search: Option<SearchCallback>,
    clock: Clock,
    store: Option<Box<dyn ValueStore>>,
    seen_revision: u64,
}

impl Session {
    pub fn new(config: EditorConfig) -> Result<Self, ConfigError> {
        Self::with_document(config, value::default_value())
    }

    pub fn with_document(config: EditorConfig, doc: Document) -> Result<Self, ConfigError> {
        let config = config.with_defaults();
        config.validate()?;
        let previous_char = config.previous_char_pattern()?;

        let editor = Editor::with_config(doc, &config);
        let seen_revision = editor.revision();
        Ok(Self {
            editor,
            slash: Menu::new("slash", default_slash_commands()).empty_text(SLASH_EMPTY_TEXT),
            mention: Menu::new("mention", config.mention_options.clone())
                .empty_text(MENTION_EMPTY_TEXT),
            slash_detector: TriggerDetector::new(config.slash_trigger, previous_char.clone()),
            mention_detector: TriggerDetector::new(config.mention_trigger, previous_char),
            autoformat: Autoformat::new(&config.autoformat_rules, config.autoformat_trigger)?,
            search: Debouncer::new(config.mention_search_debounce),
            on_search: None,
            clock: Box::new(Instant::now),
            store: None,
            seen_revision,
        })
    }

    /// Loads from `store` and saves back to it after every change. Falls
    /// back to the starter document when the stored value does not import.
    pub fn with_store(config: EditorConfig, store: Box<dyn ValueStore>) -> Result<Self, ConfigError> {
        let doc = value::load_or(store.as_ref(), value::default_value());
        let mut session = Self::with_document(config, doc)?;
        session.store = Some(store);
        Ok(session)
    }

    pub fn on_mention_search(mut self, callback: impl FnMut(&str) + 'static) -> Self {
        self.on_search = Some(Box::new(callback));
        self
    }

    /// Time source for scheduling the mention search. `tick` is compared
    /// against it.
    pub fn with_clock(mut self, clock: impl Fn() -> Instant + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn slash_menu(&self) -> &Menu<SlashCommand> {
        &self.slash
    }

    pub fn mention_menu(&self) -> &Menu<MentionOption> {
        &self.mention
    }

    pub fn active_menu(&self) -> Option<ActiveMenu<'_>> {
        if let Some(open) = self.slash.open_menu() {
            return Some(ActiveMenu::Slash(open));
        }
        self.mention.open_menu().map(ActiveMenu::Mention)
    }

    pub fn update<R>(&mut self, f: impl FnOnce(&mut Editor) -> R) -> R {
        let out = f(&mut self.editor);
        self.after_change();
        out
    }

    /// Inserts typed text at the cursor. The autoformat trigger character
    /// runs the autoformat rules first and is dropped when one applies.
    pub fn type_text(&mut self, text: &str) {
        let trigger = self.autoformat.trigger();
        let mut pending = String::new();
        for ch in text.chars() {
            if ch == trigger {
                self.flush_text(&mut pending);
                if self.autoformat.apply(&mut self.editor) {
                    continue;
                }
            }
            pending.push(ch);
        }
        self.flush_text(&mut pending);
        self.after_change();
    }

    fn flush_text(&mut self, pending: &mut String) {
        if !pending.is_empty() {
            self.editor.insert_text(pending, None);
            pending.clear();
        }
    }

    pub fn insert_break(&mut self) {
        self.update(Editor::insert_break);
    }

    pub fn delete_backward(&mut self) {
        self.update(Editor::delete_backward);
    }

    pub fn delete_forward(&mut self) {
        self.update(Editor::delete_forward);
    }

    /// Routes a navigation key to the open menu. Keys pass through when no
    /// menu is open.
    pub fn handle_key(&mut self, key: MenuKey) -> KeyOutcome {
        let outcome = if self.slash.is_open() {
            self.slash.handle_key(key, &mut self.editor)
        } else if self.mention.is_open() {
            self.mention.handle_key(key, &mut self.editor)
        } else {
            KeyOutcome::PassThrough
        };
        if outcome == KeyOutcome::Handled {
            self.after_change();
        }
        outcome
    }

    pub fn blur(&mut self) {
        self.slash.close();
        self.mention.close();
        self.search.cancel();
    }

    pub fn set_mention_options(&mut self, options: Vec<MentionOption>) {
        self.mention.set_candidates(options);
    }

    pub fn tick(&mut self, now: Instant) {
        let Some(query) = self.search.poll(now) else {
            return;
        };
        debug!(query = %query, "mention search");
        if let Some(callback) = self.on_search.as_mut() {
            callback(&query);
        }
    }

    /// Post-render step: positions open menus under their trigger text.
    pub fn layout_menus(&mut self, layout: &dyn LayoutProvider) {
        let doc = self.editor.doc();
        let slash_anchor = self
            .slash
            .open_menu()
            .and_then(|open| layout.range_rect(doc, &open.target))
            .map(MenuAnchor::from);
        let mention_anchor = self
            .mention
            .open_menu()
            .and_then(|open| layout.range_rect(doc, &open.target))
            .map(MenuAnchor::from);
        self.slash.set_anchor(slash_anchor);
        self.mention.set_anchor(mention_anchor);
    }

    pub fn sync(&mut self) {
        self.after_change();
    }

    fn after_change(&mut self) {
        let slash = self.slash_detector.detect(&self.editor);
        let mention = self.mention_detector.detect(&self.editor);
        let (slash, mention) = nearest_trigger(slash, mention);

        let previous_query = self.mention.open_menu().map(|open| open.query.clone());
        self.slash.sync(slash.as_ref());
        self.mention.sync(mention.as_ref());

        match self.mention.open_menu() {
            Some(open) if previous_query.as_deref() != Some(open.query.as_str()) => {
                self.search.schedule(open.query.clone(), (self.clock)());
            }
            Some(_) => {}
            None => self.search.cancel(),
        }

        self.persist();
    }

    fn persist(&mut self) {
        let revision = self.editor.revision();
        if revision == self.seen_revision {
            return;
        }
        self.seen_revision = revision;
        let Some(store) = self.store.as_mut() else {
            return;
        };
        match value::to_json(self.editor.doc()) {
            Ok(json) => store.save(&json),
            Err(err) => warn!(%err, "failed to serialize document"),
        }
    }

    /// Replaces the document with an imported value. On failure the current
    /// document stays as it is.
    pub fn import_json(&mut self, json: &str) -> Result<(), ImportError> {
        let doc = value::from_json(json).inspect_err(|err| warn!(%err, "import rejected"))?;
        self.slash.close();
        self.mention.close();
        self.editor.replace_document(doc);
        self.after_change();
        Ok(())
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        value::to_json(self.editor.doc())
    }

    pub fn preview(&self) -> Result<Editor, ImportError> {
        let json = self.export_json()?;
        Ok(Editor::read_only(value::from_json(&json)?))
    }
}

/// Keeps only the trigger closest to the cursor. Slash wins a tie.
fn nearest_trigger(
    slash: Option<TriggerMatch>,
    mention: Option<TriggerMatch>,
) -> (Option<TriggerMatch>, Option<TriggerMatch>) {
    match (slash, mention) {
        (Some(slash), Some(mention)) => {
            if mention.marker_point() > slash.marker_point() {
                (None, Some(mention))
            } else {
                (Some(slash), None)
            }
        }
        other => other,
    }
}
