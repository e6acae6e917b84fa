// Entity registry - droplet id -> sprite handle, with soft delete / revive
use protocol::{DropletId, DropletInfo, Location};
use std::collections::BTreeMap;

use crate::config::VisConfig;
use crate::render::{SpriteId, Stage};
use crate::utils;

/// Lifecycle of a registry entry. Deleted entries keep their sprite (hidden)
/// so the same id can come back later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Active,
    /// Deleted during reconcile generation `since`.
    Deleted { since: u64 },
}

/// Live registry entry for one droplet id.
#[derive(Debug, Clone)]
pub struct Handle {
    pub sprite: SpriteId,
    /// Last location a transition was issued towards.
    pub location: Location,
    pub shape: Vec<Location>,
    pub volume: f64,
    pub info: serde_json::Value,
    pub state: HandleState,
}

impl Handle {
    #[inline]
    pub fn is_deleted(&self) -> bool {
        matches!(self.state, HandleState::Deleted { .. })
    }

    /// Mirror the descriptor's volume/info/shape, redrawing circles only when
    /// the geometry actually changed.
    pub fn apply<S: Stage>(&mut self, stage: &mut S, desc: &DropletInfo, config: &VisConfig) {
        if self.shape != desc.shape || self.volume != desc.volume {
            stage.set_circles(self.sprite, config.circles(&desc.shape, desc.volume));
            self.shape = desc.shape.clone();
            self.volume = desc.volume;
        }
        self.info = desc.info.clone();
    }
}

#[derive(Debug, Default)]
pub struct EntityRegistry {
    handles: BTreeMap<DropletId, Handle>,
    generation: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: DropletId) -> Option<&Handle> {
        self.handles.get(&id)
    }

    pub fn get_mut(&mut self, id: DropletId) -> Option<&mut Handle> {
        self.handles.get_mut(&id)
    }

    pub fn contains(&self, id: DropletId) -> bool {
        self.handles.contains_key(&id)
    }

    /// Number of entries, deleted ones included.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DropletId, &Handle)> {
        self.handles.iter().map(|(id, h)| (*id, h))
    }

    /// Ids of entries that are currently shown.
    pub fn active_ids(&self) -> Vec<DropletId> {
        self.handles
            .iter()
            .filter(|(_, h)| !h.is_deleted())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new reconcile generation and return its number.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Return the handle for `desc.id`, creating it (sprite placed directly at
    /// the target location) when absent. The flag is true on creation.
    pub fn upsert<S: Stage>(
        &mut self,
        stage: &mut S,
        desc: &DropletInfo,
        config: &VisConfig,
    ) -> (&mut Handle, bool) {
        let mut created = false;
        let handle = self.handles.entry(desc.id).or_insert_with(|| {
            created = true;
            let sprite = stage.spawn(
                config.pixel_position(desc.location),
                config.circles(&desc.shape, desc.volume),
                utils::color_for(desc.id.0),
            );
            Handle {
                sprite,
                location: desc.location,
                shape: desc.shape.clone(),
                volume: desc.volume,
                info: desc.info.clone(),
                state: HandleState::Active,
            }
        });
        (handle, created)
    }

    /// Hide an active entry without forgetting it. Returns false when the id
    /// is unknown or already deleted.
    pub fn soft_delete<S: Stage>(&mut self, stage: &mut S, id: DropletId) -> bool {
        let generation = self.generation;
        match self.handles.get_mut(&id) {
            Some(handle) if !handle.is_deleted() => {
                handle.state = HandleState::Deleted { since: generation };
                stage.set_visible(handle.sprite, false);
                true
            }
            _ => false,
        }
    }

    /// Show a deleted entry again. Returns false when the id is unknown or
    /// already active.
    pub fn revive<S: Stage>(&mut self, stage: &mut S, id: DropletId) -> bool {
        match self.handles.get_mut(&id) {
            Some(handle) if handle.is_deleted() => {
                handle.state = HandleState::Active;
                stage.set_visible(handle.sprite, true);
                true
            }
            _ => false,
        }
    }

    /// Hard-remove entries deleted more than `after` generations ago and
    /// destroy their sprites.
    pub fn evict_deleted<S: Stage>(&mut self, stage: &mut S, after: u64) -> Vec<DropletId> {
        let generation = self.generation;
        let expired: Vec<DropletId> = self
            .handles
            .iter()
            .filter_map(|(id, h)| match h.state {
                HandleState::Deleted { since } if generation.saturating_sub(since) > after => Some(*id),
                _ => None,
            })
            .collect();

        for id in &expired {
            if let Some(handle) = self.handles.remove(id) {
                stage.destroy(handle.sprite);
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Scene;

    #[test]
    fn test_upsert_creates_once() {
        let config = VisConfig::default();
        let mut stage = Scene::new();
        let mut registry = EntityRegistry::new();
        let desc = DropletInfo::new(5, Location::new(2, 3), 1.0);

        let (sprite, created) = {
            let (h, created) = registry.upsert(&mut stage, &desc, &config);
            (h.sprite, created)
        };
        assert!(created);
        assert_eq!(stage.position(sprite), Some(config.pixel_position(Location::new(2, 3))));

        let (h, created) = registry.upsert(&mut stage, &desc, &config);
        assert!(!created);
        assert_eq!(h.sprite, sprite);
        assert_eq!(stage.len(), 1);
    }

    #[test]
    fn test_soft_delete_and_revive_keep_the_sprite() {
        let config = VisConfig::default();
        let mut stage = Scene::new();
        let mut registry = EntityRegistry::new();
        let desc = DropletInfo::new(1, Location::ORIGIN, 1.0);
        let sprite = registry.upsert(&mut stage, &desc, &config).0.sprite;

        assert!(registry.soft_delete(&mut stage, desc.id));
        assert!(!registry.soft_delete(&mut stage, desc.id));
        assert!(registry.get(desc.id).unwrap().is_deleted());
        assert!(!stage.sprite(sprite).unwrap().visible);
        assert_eq!(registry.len(), 1);

        assert!(registry.revive(&mut stage, desc.id));
        assert!(!registry.revive(&mut stage, desc.id));
        assert_eq!(registry.get(desc.id).unwrap().sprite, sprite);
        assert!(stage.sprite(sprite).unwrap().visible);
    }

    #[test]
    fn test_apply_overwrites_attributes() {
        let config = VisConfig::default();
        let mut stage = Scene::new();
        let mut registry = EntityRegistry::new();
        let mut desc = DropletInfo::new(1, Location::ORIGIN, 1.0);
        registry.upsert(&mut stage, &desc, &config);

        desc.volume = 4.0;
        desc.info = serde_json::json!("(a, b)");
        let handle = registry.get_mut(desc.id).unwrap();
        handle.apply(&mut stage, &desc, &config);

        assert_eq!(handle.volume, 4.0);
        assert_eq!(handle.info, serde_json::json!("(a, b)"));
        let sprite = stage.sprite(handle.sprite).unwrap();
        assert_eq!(sprite.circles[0].radius, config.base_radius * 2.0);
    }

    #[test]
    fn test_eviction_only_after_threshold() {
        let config = VisConfig::default();
        let mut stage = Scene::new();
        let mut registry = EntityRegistry::new();
        let desc = DropletInfo::new(1, Location::ORIGIN, 1.0);
        registry.upsert(&mut stage, &desc, &config);

        registry.next_generation();
        registry.soft_delete(&mut stage, desc.id);
        registry.next_generation();
        registry.next_generation();
        assert!(registry.evict_deleted(&mut stage, 2).is_empty());

        registry.next_generation();
        assert_eq!(registry.evict_deleted(&mut stage, 2), vec![desc.id]);
        assert!(registry.is_empty());
        assert!(stage.is_empty());
    }
}
