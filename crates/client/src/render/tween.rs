// Tween interpolation - position easing between two points over time
use glam::Vec2;

use crate::utils;

/// Interpolation curve applied to normalised tween progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ease {
    Linear,
    /// Quadratic ease-in/ease-out.
    #[default]
    InOutQuad,
}

impl Ease {
    /// Map linear progress `t` in `[0, 1]` onto the curve.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = utils::clamp(t, 0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// A single position tween on one sprite.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    pub from: Vec2,
    pub to: Vec2,
    /// Start time (ms, same clock as `Scene::advance`).
    pub start: f64,
    pub duration_ms: f64,
    pub ease: Ease,
}

impl Tween {
    pub fn new(from: Vec2, to: Vec2, start: f64, duration_ms: f64, ease: Ease) -> Self {
        Self {
            from,
            to,
            start,
            duration_ms: duration_ms.max(0.0),
            ease,
        }
    }

    /// Linear progress at `now`, clamped to `[0, 1]`.
    #[inline]
    pub fn progress(&self, now: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now - self.start) / self.duration_ms).clamp(0.0, 1.0) as f32
    }

    /// Eased position at `now`.
    #[inline]
    pub fn sample(&self, now: f64) -> Vec2 {
        let t = self.ease.apply(self.progress(now));
        Vec2::new(
            utils::lerp(self.from.x, self.to.x, t),
            utils::lerp(self.from.y, self.to.y, t),
        )
    }

    #[inline]
    pub fn is_finished(&self, now: f64) -> bool {
        self.progress(now) >= 1.0
    }
}
