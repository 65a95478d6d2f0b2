//! Integer grid geometry used by the net graph.
//!
//! Everything on a schematic canvas snaps to an integer grid, so points and
//! regions use `i64` coordinates and all containment tests are exact.

use serde::{Deserialize, Serialize};

/// A point on the schematic grid.
///
/// Serialised as a two element array (`[x, y]`) to keep design files compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn translate(self, dx: i64, dy: i64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Offset this point by another point treated as a vector.
    pub fn offset(self, by: Point) -> Self {
        self.translate(by.x, by.y)
    }
}

impl From<(i64, i64)> for Point {
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i64, i64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned bounding region. Both corners are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    /// Build the smallest region covering both points, in any order.
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Grow the region by `margin` on every side.
    pub fn expand(&self, margin: i64) -> Self {
        Self {
            min: self.min.translate(-margin, -margin),
            max: self.max.translate(margin, margin),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y)
    }

    pub fn width(&self) -> i64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i64 {
        self.max.y - self.min.y
    }
}

/// Placement orientation of a symbol on the canvas.
///
/// Rotations are counter-clockwise in a y-down screen coordinate system,
/// matching how symbols are drawn. `MX` mirrors across the x axis (flips y),
/// `MY` mirrors across the y axis (flips x).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    R0,
    R90,
    R180,
    R270,
    MX,
    MY,
}

impl Orientation {
    /// Apply the orientation to a symbol-local point (around the origin).
    pub fn apply(self, p: Point) -> Point {
        match self {
            Orientation::R0 => p,
            Orientation::R90 => Point::new(p.y, -p.x),
            Orientation::R180 => Point::new(-p.x, -p.y),
            Orientation::R270 => Point::new(-p.y, p.x),
            Orientation::MX => Point::new(p.x, -p.y),
            Orientation::MY => Point::new(-p.x, p.y),
        }
    }

    /// Orient a symbol-local point and then move it to `origin`.
    pub fn place(self, local: Point, origin: Point) -> Point {
        self.apply(local).offset(origin)
    }
}
