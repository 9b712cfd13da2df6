use serde::{Deserialize, Serialize};

pub type Path = Vec<usize>;

/// A position inside a text leaf. `offset` is a byte offset at a char boundary.
///
/// Points order by path first (lexicographically, ancestors before
/// descendants) and then by offset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self) -> bool {
        self.focus < self.anchor
    }

    /// `(start, end)` in document order.
    pub fn edges(&self) -> (&Point, &Point) {
        if self.is_backward() {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        }
    }

    pub fn start(&self) -> &Point {
        self.edges().0
    }

    pub fn end(&self) -> &Point {
        self.edges().1
    }

    pub fn edge(&self, edge: Edge) -> &Point {
        match edge {
            Edge::Anchor => &self.anchor,
            Edge::Focus => &self.focus,
            Edge::Start => self.start(),
            Edge::End => self.end(),
        }
    }

    pub fn contains(&self, point: &Point) -> bool {
        let (start, end) = self.edges();
        start <= point && point <= end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    Anchor,
    Focus,
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

/// Where a transform applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Path(Path),
    Point(Point),
    Range(Range),
}

impl From<Path> for Location {
    fn from(value: Path) -> Self {
        Location::Path(value)
    }
}

impl From<Point> for Location {
    fn from(value: Point) -> Self {
        Location::Point(value)
    }
}

impl From<Range> for Location {
    fn from(value: Range) -> Self {
        Location::Range(value)
    }
}

pub(crate) fn split_parent(path: &[usize]) -> Option<(&[usize], usize)> {
    let (last, parent) = path.split_last()?;
    Some((parent, *last))
}

pub(crate) fn child_path(parent: &[usize], ix: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}

pub(crate) fn is_ancestor(ancestor: &[usize], path: &[usize]) -> bool {
    ancestor.len() < path.len() && path.starts_with(ancestor)
}
