//! Offsets inside a single text block.
//!
//! A block's inline content is measured as one run: text leaves count their
//! byte length (including leaves inside links) and every void element counts
//! as one position.

use crate::location::{Path, Point};
use crate::node::{Element, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Affinity {
    /// Prefer the end of the earlier leaf at a boundary.
    Backward,
    /// Prefer the start of the later leaf at a boundary.
    Forward,
}

enum Stop<'a> {
    Leaf {
        rel: Path,
        start: usize,
        text: &'a str,
    },
    Void {
        rel: Path,
        start: usize,
    },
}

fn stops(block: &Element) -> Vec<Stop<'_>> {
    fn walk<'a>(children: &'a [Node], rel: &mut Path, g: &mut usize, out: &mut Vec<Stop<'a>>) {
        for (ix, node) in children.iter().enumerate() {
            rel.push(ix);
            match node {
                Node::Text(t) => {
                    out.push(Stop::Leaf {
                        rel: rel.clone(),
                        start: *g,
                        text: &t.text,
                    });
                    *g += t.text.len();
                }
                Node::Element(el) if el.kind.is_void() => {
                    out.push(Stop::Void {
                        rel: rel.clone(),
                        start: *g,
                    });
                    *g += 1;
                }
                Node::Element(el) => walk(&el.children, rel, g, out),
            }
            rel.pop();
        }
    }

    let mut out = Vec::new();
    walk(&block.children, &mut Vec::new(), &mut 0, &mut out);
    out
}

pub(crate) fn block_len(block: &Element) -> usize {
    match stops(block).last() {
        Some(Stop::Leaf { start, text, .. }) => start + text.len(),
        Some(Stop::Void { start, .. }) => start + 1,
        None => 0,
    }
}

/// Offset of a point given by its path relative to the block.
pub(crate) fn offset_in_block(block: &Element, rel: &[usize], offset: usize) -> usize {
    for stop in stops(block) {
        match stop {
            Stop::Leaf { rel: path, start, text } if path == rel => {
                return start + offset.min(text.len());
            }
            Stop::Void { rel: path, start } if rel.starts_with(&path) => return start,
            _ => {}
        }
    }
    block_len(block)
}

pub(crate) fn point_in_block(
    block_path: &[usize],
    block: &Element,
    g: usize,
    affinity: Affinity,
) -> Option<Point> {
    let candidates = stops(block).into_iter().filter_map(|stop| match stop {
        Stop::Leaf { rel, start, text } if start <= g && g <= start + text.len() => {
            Some((rel, g - start))
        }
        _ => None,
    });
    let (rel, offset) = match affinity {
        Affinity::Backward => candidates.into_iter().next(),
        Affinity::Forward => candidates.into_iter().last(),
    }?;
    let mut path = block_path.to_vec();
    path.extend(rel);
    Some(Point::new(path, offset))
}

pub(crate) fn step_forward(block: &Element, g: usize) -> Option<usize> {
    let stops = stops(block);
    if stops
        .iter()
        .any(|stop| matches!(stop, Stop::Void { start, .. } if *start == g))
    {
        return Some(g + 1);
    }
    stops.iter().find_map(|stop| match stop {
        Stop::Leaf { start, text, .. } if *start <= g && g < start + text.len() => text
            [g - start..]
            .chars()
            .next()
            .map(|c| g + c.len_utf8()),
        _ => None,
    })
}

pub(crate) fn step_backward(block: &Element, g: usize) -> Option<usize> {
    if g == 0 {
        return None;
    }
    let stops = stops(block);
    if stops
        .iter()
        .any(|stop| matches!(stop, Stop::Void { start, .. } if start + 1 == g))
    {
        return Some(g - 1);
    }
    stops.iter().find_map(|stop| match stop {
        Stop::Leaf { start, text, .. } if *start < g && g <= start + text.len() => text
            [..g - start]
            .chars()
            .next_back()
            .map(|c| g - c.len_utf8()),
        _ => None,
    })
}

/// Text between the nearest preceding void (or the block start) and `g`,
/// with the offset where that run starts.
pub(crate) fn text_before(block: &Element, g: usize) -> (String, usize) {
    let mut run = String::new();
    let mut run_start = 0;
    for stop in stops(block) {
        match stop {
            Stop::Void { start, .. } => {
                if start >= g {
                    break;
                }
                run.clear();
                run_start = start + 1;
            }
            Stop::Leaf { start, text, .. } => {
                if start >= g && !text.is_empty() {
                    break;
                }
                let end = (g - start.min(g)).min(text.len());
                run.push_str(&text[..end]);
            }
        }
    }
    (run, run_start)
}

/// Text from `g` up to the next void or the block end.
pub(crate) fn text_after(block: &Element, g: usize) -> String {
    let mut run = String::new();
    for stop in stops(block) {
        match stop {
            Stop::Void { start, .. } => {
                if start >= g {
                    break;
                }
            }
            Stop::Leaf { start, text, .. } => {
                let end = start + text.len();
                if end <= g {
                    continue;
                }
                run.push_str(&text[g.saturating_sub(start)..]);
            }
        }
    }
    run
}
