//! Grid coordinate system.
//!
//! This module provides the coordinate types for the square tile grid:
//! - `Coord`: Identifies a single tile (`x` grows east, `y` grows south)
//! - `Direction`: The four cardinal steps an actor can take
//! - `Rect`: Axis-aligned footprints used by settlements
//!
//! Tiles are stored row-major (`[y][x]`), so `y` is the row and `x` the column.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid coordinate.
///
/// Coordinates are signed so that a step off the western or northern edge is
/// still representable and can be rejected by a bounds check.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(from = "CoordWire")]
pub struct Coord {
    /// Column (increases going east)
    pub x: i32,
    /// Row (increases going south)
    pub y: i32,
}

/// Accepted wire shapes for a coordinate: `{x, y}` or `[x, y]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CoordWire {
    Pair([i32; 2]),
    Point { x: i32, y: i32 },
}

impl From<CoordWire> for Coord {
    fn from(wire: CoordWire) -> Self {
        match wire {
            CoordWire::Pair([x, y]) => Coord::new(x, y),
            CoordWire::Point { x, y } => Coord::new(x, y),
        }
    }
}

impl Coord {
    /// Create a new coordinate
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring coordinate one step in `direction`
    ///
    /// Saturates at the edges of the `i32` range.
    pub fn step(&self, direction: Direction) -> Coord {
        let (dx, dy) = direction.delta();
        Coord::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Like [`Coord::step`], but `None` when the step leaves the `i32` range
    pub fn checked_step(&self, direction: Direction) -> Option<Coord> {
        let (dx, dy) = direction.delta();
        Some(Coord::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    /// The four orthogonal neighbours in N, E, S, W order
    pub fn neighbors(&self) -> [Coord; 4] {
        Direction::ALL.map(|dir| self.step(dir))
    }

    /// Key used by the draft buffer export (`"x,y"`)
    pub fn key(&self) -> String {
        format!("{},{}", self.x, self.y)
    }

    /// Parse a `"x,y"` key back into a coordinate
    pub fn from_key(key: &str) -> Option<Self> {
        let (x, y) = key.split_once(',')?;
        Some(Coord::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Cardinal step direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All directions in clockwise order starting from North
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Parse a direction token (`N`, `east`, ...). Case-insensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Some(Direction::North),
            "e" | "east" => Some(Direction::East),
            "s" | "south" => Some(Direction::South),
            "w" | "west" => Some(Direction::West),
            _ => None,
        }
    }

    /// Short token for this direction
    pub fn token(&self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::East => "E",
            Direction::South => "S",
            Direction::West => "W",
        }
    }

    /// (dx, dy) for one step
    pub const fn delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

/// Axis-aligned rectangle on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge
    pub fn right(&self) -> i64 {
        self.x as i64 + self.w as i64
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.h as i64
    }

    /// Whether two rectangles share at least one tile
    pub fn overlaps(&self, other: &Rect) -> bool {
        (self.x as i64) < other.right()
            && (other.x as i64) < self.right()
            && (self.y as i64) < other.bottom()
            && (other.y as i64) < self.bottom()
    }

    pub fn contains(&self, coord: &Coord) -> bool {
        (coord.x as i64) >= self.x as i64
            && (coord.x as i64) < self.right()
            && (coord.y as i64) >= self.y as i64
            && (coord.y as i64) < self.bottom()
    }

    /// Every coordinate covered by the rectangle, row by row
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.h as i32).flat_map(move |dy| {
            (0..self.w as i32).map(move |dx| Coord::new(self.x + dx, self.y + dy))
        })
    }
}
