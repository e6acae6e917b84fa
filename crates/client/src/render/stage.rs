// Sprite stage - the drawing surface the reconciler talks to, plus the
// in-memory scene graph and tween engine the canvas renderer draws from.
use glam::Vec2;
use std::collections::BTreeMap;

use super::tween::{Ease, Tween};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpriteId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransitionId(u64);

/// One filled circle, positioned relative to its sprite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub offset: Vec2,
    pub radius: f32,
}

/// Visual collaborator of the reconciler: owns sprites and their motion.
pub trait Stage {
    /// Create a visible sprite at `at`.
    fn spawn(&mut self, at: Vec2, circles: Vec<Circle>, color: (u8, u8, u8)) -> SpriteId;

    /// Replace a sprite's child circles.
    fn set_circles(&mut self, sprite: SpriteId, circles: Vec<Circle>);

    fn set_visible(&mut self, sprite: SpriteId, visible: bool);

    /// Current (possibly mid-tween) position.
    fn position(&self, sprite: SpriteId) -> Option<Vec2>;

    /// Start moving `sprite` from its current position to `to`. A tween
    /// already running on the sprite is superseded and reported finished.
    fn tween_to(&mut self, sprite: SpriteId, to: Vec2, duration_ms: f64, ease: Ease) -> TransitionId;

    fn destroy(&mut self, sprite: SpriteId);
}

#[derive(Debug, Clone)]
pub struct Sprite {
    pub position: Vec2,
    pub circles: Vec<Circle>,
    pub color: (u8, u8, u8),
    pub visible: bool,
}

#[derive(Debug, Clone, Copy)]
struct ActiveTween {
    id: TransitionId,
    sprite: SpriteId,
    tween: Tween,
}

/// In-memory sprite stage. Time only moves when `advance` is called.
#[derive(Debug, Default)]
pub struct Scene {
    sprites: BTreeMap<SpriteId, Sprite>,
    tweens: Vec<ActiveTween>,
    /// Superseded or orphaned tweens, reported on the next `advance`.
    finished: Vec<TransitionId>,
    next_sprite: u32,
    next_transition: u64,
    clock: f64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Move the clock to `now`, step every tween and return the transitions
    /// that completed, in the order they were started.
    pub fn advance(&mut self, now: f64) -> Vec<TransitionId> {
        self.clock = self.clock.max(now);
        let mut done = std::mem::take(&mut self.finished);
        let clock = self.clock;
        let sprites = &mut self.sprites;
        self.tweens.retain(|active| {
            if let Some(sprite) = sprites.get_mut(&active.sprite) {
                sprite.position = active.tween.sample(clock);
            }
            if active.tween.is_finished(clock) {
                done.push(active.id);
                false
            } else {
                true
            }
        });
        done
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(&id)
    }

    pub fn sprites(&self) -> impl Iterator<Item = (SpriteId, &Sprite)> {
        self.sprites.iter().map(|(id, s)| (*id, s))
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn active_tweens(&self) -> usize {
        self.tweens.len()
    }

    /// The running tween with this id, if it has not completed yet.
    pub fn tween(&self, id: TransitionId) -> Option<&Tween> {
        self.tweens.iter().find(|t| t.id == id).map(|t| &t.tween)
    }

    fn supersede(&mut self, sprite: SpriteId) {
        let finished = &mut self.finished;
        self.tweens.retain(|active| {
            if active.sprite == sprite {
                finished.push(active.id);
                false
            } else {
                true
            }
        });
    }
}

impl Stage for Scene {
    fn spawn(&mut self, at: Vec2, circles: Vec<Circle>, color: (u8, u8, u8)) -> SpriteId {
        let id = SpriteId(self.next_sprite);
        self.next_sprite += 1;
        self.sprites.insert(
            id,
            Sprite {
                position: at,
                circles,
                color,
                visible: true,
            },
        );
        id
    }

    fn set_circles(&mut self, sprite: SpriteId, circles: Vec<Circle>) {
        if let Some(s) = self.sprites.get_mut(&sprite) {
            s.circles = circles;
        }
    }

    fn set_visible(&mut self, sprite: SpriteId, visible: bool) {
        if let Some(s) = self.sprites.get_mut(&sprite) {
            s.visible = visible;
        }
    }

    fn position(&self, sprite: SpriteId) -> Option<Vec2> {
        self.sprites.get(&sprite).map(|s| s.position)
    }

    fn tween_to(&mut self, sprite: SpriteId, to: Vec2, duration_ms: f64, ease: Ease) -> TransitionId {
        self.supersede(sprite);
        let id = TransitionId(self.next_transition);
        self.next_transition += 1;
        match self.sprites.get(&sprite) {
            Some(s) => self.tweens.push(ActiveTween {
                id,
                sprite,
                tween: Tween::new(s.position, to, self.clock, duration_ms, ease),
            }),
            // Nothing to move; complete on the next frame so no batch waits on it.
            None => self.finished.push(id),
        }
        id
    }

    fn destroy(&mut self, sprite: SpriteId) {
        self.supersede(sprite);
        self.sprites.remove(&sprite);
    }
}
