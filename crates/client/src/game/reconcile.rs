// Reconciler - diff a snapshot against the registry and issue transitions
use protocol::{DropletId, Snapshot};
use tracing::trace;

use crate::config::VisConfig;
use crate::render::{Ease, Stage, TransitionId};

use super::registry::EntityRegistry;

/// What one reconcile did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// First transition issued; its completion advances the queue. `None`
    /// when every droplet in the snapshot was new.
    pub lead: Option<TransitionId>,
    pub created: Vec<DropletId>,
    pub revived: Vec<DropletId>,
    pub moved: Vec<DropletId>,
    pub deleted: Vec<DropletId>,
    pub duration_ms: f64,
}

impl Batch {
    pub fn transitions(&self) -> usize {
        self.moved.len()
    }
}

/// Apply `snapshot` to the registry. `queued` is the number of snapshots
/// still waiting behind this one and shortens the transition duration.
pub fn animate<S: Stage>(
    registry: &mut EntityRegistry,
    stage: &mut S,
    snapshot: &Snapshot,
    config: &VisConfig,
    queued: usize,
) -> Batch {
    let mut batch = Batch {
        duration_ms: config.transition_duration(queued),
        ..Batch::default()
    };
    registry.next_generation();

    // Gone from this snapshot: consumed by a mix/split or removed.
    let present = snapshot.ids();
    for id in registry.active_ids() {
        if !present.contains(&id) && registry.soft_delete(stage, id) {
            batch.deleted.push(id);
        }
    }

    for desc in snapshot {
        let created = registry.upsert(stage, desc, config).1;
        if created {
            batch.created.push(desc.id);
            continue;
        }

        if registry.revive(stage, desc.id) {
            batch.revived.push(desc.id);
        }

        let Some(handle) = registry.get_mut(desc.id) else {
            continue;
        };
        handle.apply(stage, desc, config);
        handle.location = desc.location;

        let target = config.pixel_position(desc.location);
        let transition = stage.tween_to(handle.sprite, target, batch.duration_ms, Ease::InOutQuad);
        if batch.lead.is_none() {
            batch.lead = Some(transition);
        }
        batch.moved.push(desc.id);
    }

    trace!(
        created = batch.created.len(),
        moved = batch.moved.len(),
        revived = batch.revived.len(),
        deleted = batch.deleted.len(),
        "reconciled snapshot"
    );
    batch
}

/// Create every droplet in `snapshot` in place. Used for the very first
/// snapshot of a session.
pub fn populate<S: Stage>(
    registry: &mut EntityRegistry,
    stage: &mut S,
    snapshot: &Snapshot,
    config: &VisConfig,
) -> Vec<DropletId> {
    snapshot
        .iter()
        .filter(|desc| registry.upsert(stage, desc, config).1)
        .map(|desc| desc.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Scene;
    use protocol::{DropletInfo, Location};

    fn snap(droplets: &[(u64, i32, i32)]) -> Snapshot {
        Snapshot::new(
            droplets
                .iter()
                .map(|&(id, y, x)| DropletInfo::new(id, Location::new(y, x), 1.0))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_batch_classifies_droplets() {
        let config = VisConfig::default();
        let mut stage = Scene::new();
        let mut registry = EntityRegistry::new();
        populate(&mut registry, &mut stage, &snap(&[(1, 0, 0), (2, 2, 2)]), &config);

        let batch = animate(&mut registry, &mut stage, &snap(&[(3, 4, 4), (1, 1, 0)]), &config, 0);
        assert_eq!(batch.created, vec![DropletId(3)]);
        assert_eq!(batch.moved, vec![DropletId(1)]);
        assert_eq!(batch.deleted, vec![DropletId(2)]);
        assert!(batch.revived.is_empty());
        assert!(batch.lead.is_some());
        assert_eq!(batch.duration_ms, 500.0);
    }

    #[test]
    fn test_all_new_snapshot_has_no_lead() {
        let config = VisConfig::default();
        let mut stage = Scene::new();
        let mut registry = EntityRegistry::new();
        populate(&mut registry, &mut stage, &snap(&[(1, 0, 0)]), &config);

        let batch = animate(&mut registry, &mut stage, &snap(&[(2, 0, 0)]), &config, 3);
        assert_eq!(batch.lead, None);
        assert_eq!(batch.transitions(), 0);
        assert_eq!(batch.duration_ms, 125.0);
        assert_eq!(stage.active_tweens(), 0);
    }

    #[test]
    fn test_every_persisting_droplet_moves() {
        let config = VisConfig::default();
        let mut stage = Scene::new();
        let mut registry = EntityRegistry::new();
        populate(&mut registry, &mut stage, &snap(&[(1, 0, 0), (2, 0, 4)]), &config);

        let batch = animate(&mut registry, &mut stage, &snap(&[(2, 0, 5), (1, 0, 1)]), &config, 0);
        assert_eq!(batch.moved, vec![DropletId(2), DropletId(1)]);
        assert_eq!(stage.active_tweens(), 2);
        // lead follows snapshot order, not id order
        let lead = batch.lead.unwrap();
        assert_eq!(stage.tween(lead).unwrap().to, config.pixel_position(Location::new(0, 5)));
        assert_eq!(registry.get(DropletId(1)).unwrap().location, Location::new(0, 1));
    }
}
