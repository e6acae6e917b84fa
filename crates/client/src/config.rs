// Visualizer settings - layout, timing, polling
use glam::Vec2;
use protocol::{Location, STATE_PATH};
use serde::Deserialize;

use crate::render::Circle;

/// Client configuration. Every field can be overridden from the options
/// object handed to the JS constructor, e.g. `{ cellSize: 32 }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisConfig {
    /// Endpoint polled for the next board state.
    #[serde(default = "default_state_url")]
    pub state_url: String,
    /// Pixel size of one grid cell.
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    /// Fixed vertical offset applied to every sprite (room for the toolbar).
    #[serde(default = "default_y_offset")]
    pub y_offset: f32,
    /// Circle radius of a droplet with volume 1.
    #[serde(default = "default_base_radius")]
    pub base_radius: f32,
    /// Duration of a transition when nothing is queued behind it.
    #[serde(default = "default_base_duration")]
    pub base_duration_ms: f64,
    /// Period of the continuous ("ready") polling timer.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: i32,
    /// Hard-remove droplets that stayed deleted for this many reconciles.
    /// `None` keeps every identifier for the whole session.
    #[serde(default)]
    pub evict_after_generations: Option<u64>,
    /// Draw grid lines behind the droplets.
    #[serde(default = "default_show_grid")]
    pub show_grid: bool,
}

impl Default for VisConfig {
    fn default() -> Self {
        Self {
            state_url: default_state_url(),
            cell_size: default_cell_size(),
            y_offset: default_y_offset(),
            base_radius: default_base_radius(),
            base_duration_ms: default_base_duration(),
            poll_interval_ms: default_poll_interval(),
            evict_after_generations: None,
            show_grid: default_show_grid(),
        }
    }
}

fn default_state_url() -> String {
    STATE_PATH.to_string()
}
fn default_cell_size() -> f32 {
    40.0
}
fn default_y_offset() -> f32 {
    40.0
}
fn default_base_radius() -> f32 {
    16.0
}
fn default_base_duration() -> f64 {
    500.0
}
fn default_poll_interval() -> i32 {
    500
}
fn default_show_grid() -> bool {
    true
}

impl VisConfig {
    /// Pixel position of a droplet anchored at `loc`.
    #[inline]
    pub fn pixel_position(&self, loc: Location) -> Vec2 {
        loc.to_vec2(self.cell_size) + Vec2::new(0.0, self.y_offset)
    }

    /// One circle per shape cell, relative to the sprite origin.
    /// Radius grows with the square root of the volume (area ∝ volume).
    pub fn circles(&self, shape: &[Location], volume: f64) -> Vec<Circle> {
        let radius = self.base_radius * (volume.max(0.0) as f32).sqrt();
        shape
            .iter()
            .map(|off| Circle {
                offset: off.to_vec2(self.cell_size),
                radius,
            })
            .collect()
    }

    /// Transition duration when `queued` snapshots wait behind the batch.
    #[inline]
    pub fn transition_duration(&self, queued: usize) -> f64 {
        self.base_duration_ms / (queued as f64 + 1.0)
    }
}
