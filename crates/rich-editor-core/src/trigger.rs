use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::Editor;
use crate::inline::{self, Affinity};
use crate::location::{Point, Range};

static WORD_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w*$").expect("word tail pattern is valid"));
static AFTER_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\s|$)").expect("boundary pattern is valid"));

/// A trigger occurrence: `range` spans the marker through the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerMatch {
    pub marker: char,
    pub range: Range,
    pub query: String,
}

impl TriggerMatch {
    /// Where the marker sits. Identifies the occurrence across edits of its query.
    pub fn marker_point(&self) -> &Point {
        self.range.start()
    }
}

/// Finds `<marker><word>` directly before a collapsed cursor.
///
/// The marker must sit at the start of a text run or follow a character
/// matching `previous_char`, and the cursor must be followed by whitespace or
/// the end of the block.
#[derive(Debug, Clone)]
pub struct TriggerDetector {
    marker: char,
    previous_char: Regex,
}

impl TriggerDetector {
    pub fn new(marker: char, previous_char: Regex) -> Self {
        Self {
            marker,
            previous_char,
        }
    }

    pub fn marker(&self) -> char {
        self.marker
    }

    pub fn detect(&self, editor: &Editor) -> Option<TriggerMatch> {
        let selection = editor.selection();
        if !selection.is_collapsed() {
            return None;
        }
        let cursor = &selection.focus;
        let doc = editor.doc();
        if doc.void_path(&cursor.path).is_some() {
            return None;
        }
        let block_path = doc.text_block_path(&cursor.path)?;
        let block = doc.element(&block_path)?;
        let g = inline::offset_in_block(block, &cursor.path[block_path.len()..], cursor.offset);

        let (before, run_start) = inline::text_before(block, g);
        let after = inline::text_after(block, g);
        if !AFTER_BOUNDARY.is_match(&after) {
            return None;
        }

        let tail = WORD_TAIL.find(&before)?;
        let head = &before[..tail.start()];
        let marker_at = head.strip_suffix(self.marker)?;
        let previous: String = marker_at.chars().next_back().into_iter().collect();
        if !self.previous_char.is_match(&previous) {
            return None;
        }

        let marker_offset = run_start + marker_at.len();
        let start = inline::point_in_block(&block_path, block, marker_offset, Affinity::Forward)?;
        Some(TriggerMatch {
            marker: self.marker,
            range: Range::new(start, cursor.clone()),
            query: tail.as_str().to_string(),
        })
    }
}
