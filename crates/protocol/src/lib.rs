//! Shared protocol crate for puddle-vis.
//!
//! This crate contains:
//! - Grid coordinates and droplet identifiers
//! - The droplet descriptor reported by the board server
//! - Snapshot decoding/encoding (JSON over HTTP)

mod droplet;
mod error;
mod snapshot;

pub use droplet::{DropletId, DropletInfo};
pub use error::ProtocolError;
pub use snapshot::Snapshot;

use serde::{Deserialize, Serialize};

/// Path the client polls for the next board state.
pub const STATE_PATH: &str = "/state";

/// A grid coordinate. On the wire this is `[row, col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Location {
    pub y: i32,
    pub x: i32,
}

impl Location {
    pub const ORIGIN: Location = Location { y: 0, x: 0 };

    pub const fn new(y: i32, x: i32) -> Self {
        Self { y, x }
    }

    /// Translate by a relative offset.
    #[inline]
    pub fn offset(&self, by: Location) -> Location {
        Location::new(self.y + by.y, self.x + by.x)
    }

    /// Manhattan distance.
    #[inline]
    pub fn distance_to(&self, other: &Location) -> u32 {
        self.y.abs_diff(other.y) + self.x.abs_diff(other.x)
    }

    /// True for the same cell or any of its eight surrounding cells.
    #[inline]
    pub fn is_neighbor(&self, other: &Location) -> bool {
        self.y.abs_diff(other.y) <= 1 && self.x.abs_diff(other.x) <= 1
    }

    /// Pixel-space position of this cell, given the cell size.
    #[inline]
    pub fn to_vec2(&self, cell_size: f32) -> Position {
        Position::new(self.x as f32 * cell_size, self.y as f32 * cell_size)
    }
}

impl From<[i32; 2]> for Location {
    fn from([y, x]: [i32; 2]) -> Self {
        Location { y, x }
    }
}

impl From<Location> for [i32; 2] {
    fn from(loc: Location) -> Self {
        [loc.y, loc.x]
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.y, self.x)
    }
}

/// Represents a 2D pixel position using glam's Vec2.
pub type Position = glam::Vec2;
