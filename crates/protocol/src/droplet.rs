//! Droplet descriptor as reported by the board server.

use serde::{Deserialize, Serialize};

use crate::Location;

/// Identifier of a droplet. Unique within one snapshot; the same id in a
/// later snapshot refers to the same droplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DropletId(pub u64);

impl std::fmt::Display for DropletId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One droplet's attributes within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropletInfo {
    pub id: DropletId,
    pub location: Location,
    /// Cells covered by the droplet, relative to `location`. Each one is drawn
    /// as a filled circle.
    #[serde(default = "default_shape")]
    pub shape: Vec<Location>,
    /// Controls the radius of the drawn circles.
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Opaque payload, passed through untouched.
    #[serde(default)]
    pub info: serde_json::Value,
}

fn default_shape() -> Vec<Location> {
    vec![Location::ORIGIN]
}

fn default_volume() -> f64 {
    1.0
}

impl DropletInfo {
    /// A single-cell droplet with no auxiliary info.
    pub fn new(id: u64, location: Location, volume: f64) -> Self {
        Self {
            id: DropletId(id),
            location,
            shape: default_shape(),
            volume,
            info: serde_json::Value::Null,
        }
    }

    /// Absolute grid cells covered by this droplet.
    pub fn cells(&self) -> impl Iterator<Item = Location> + '_ {
        self.shape.iter().map(move |off| self.location.offset(*off))
    }
}
