// Visualizer state - snapshot history, droplet registry and the animation
// queue that plays one snapshot's transitions at a time.
use protocol::Snapshot;
use tracing::{debug, info};

use crate::config::VisConfig;
use crate::render::{Scene, Stage, TransitionId};

mod client;
mod queue;
mod reconcile;
mod registry;
mod store;

pub use client::VisClient;
pub use queue::{AnimationQueue, InFlight};
pub use reconcile::Batch;
pub use registry::{EntityRegistry, Handle, HandleState};
pub use store::SnapshotStore;

/// Result of the "step forward" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Already at the newest frame; a new snapshot must be fetched.
    NeedsFetch,
    /// Moved to a stored frame and submitted it for display.
    Redisplay(usize),
}

/// Session state shared by every event handler.
///
/// Two cursors are kept apart: the live tail (`store.last_frame()`) which
/// always receives new arrivals, and `cursor`, the frame the user is looking
/// at. A live arrival moves the cursor to the tail.
pub struct Visualizer<S: Stage = Scene> {
    config: VisConfig,
    stage: S,
    store: SnapshotStore,
    registry: EntityRegistry,
    queue: AnimationQueue,
    cursor: usize,
    /// Reconciles dispatched so far.
    dispatched: u64,
    /// Every reconcile, in dispatch order.
    #[cfg(test)]
    played: Vec<usize>,
}

impl<S: Stage> Visualizer<S> {
    pub fn new(config: VisConfig, stage: S) -> Self {
        Self {
            config,
            stage,
            store: SnapshotStore::new(),
            registry: EntityRegistry::new(),
            queue: AnimationQueue::new(),
            cursor: 0,
            dispatched: 0,
            #[cfg(test)]
            played: Vec::new(),
        }
    }

    pub fn config(&self) -> &VisConfig {
        &self.config
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &AnimationQueue {
        &self.queue
    }

    /// Frame currently viewed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_running(&self) -> bool {
        self.queue.is_running()
    }

    /// Number of batches dispatched to the stage.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Frames reconciled so far, in the order they were dispatched.
    #[cfg(test)]
    pub fn played(&self) -> &[usize] {
        &self.played
    }

    /// Ingest a freshly fetched snapshot.
    pub fn parse_data(&mut self, snapshot: Snapshot) {
        let frame = self.store.append(snapshot);
        self.cursor = frame;

        if self.registry.is_empty() {
            // First snapshot: everything simply appears.
            if let Some(snapshot) = self.store.get(frame) {
                let created =
                    reconcile::populate(&mut self.registry, &mut self.stage, snapshot, &self.config);
                info!(frame, droplets = created.len(), "initial snapshot");
            }
            return;
        }

        self.submit(frame);
    }

    /// Play `frame` now when idle, otherwise queue it behind the running batch.
    pub fn submit(&mut self, frame: usize) {
        if self.queue.is_running() {
            self.queue.push(frame);
            debug!(frame, queued = self.queue.len(), "batch busy, snapshot queued");
        } else {
            self.dispatch(frame);
            self.animate_queue_if_idle();
        }
    }

    /// Reconcile one stored frame. Marks the queue busy when the batch has a
    /// lead transition.
    pub fn animate(&mut self, frame: usize) -> Option<Batch> {
        debug_assert!(!self.queue.is_running());
        let snapshot = self.store.get(frame)?;
        let batch = reconcile::animate(
            &mut self.registry,
            &mut self.stage,
            snapshot,
            &self.config,
            self.queue.len(),
        );
        self.dispatched += 1;
        #[cfg(test)]
        self.played.push(frame);

        if let Some(after) = self.config.evict_after_generations {
            let evicted = self.registry.evict_deleted(&mut self.stage, after);
            if !evicted.is_empty() {
                debug!(count = evicted.len(), "evicted long-deleted droplets");
            }
        }

        if let Some(lead) = batch.lead {
            self.queue.start(InFlight { frame, lead });
        }
        Some(batch)
    }

    /// Completion hook for finished transitions. Only the running batch's
    /// lead advances the queue; anything else is ignored.
    pub fn on_complete(&mut self, transition: TransitionId) {
        if self.queue.finish(transition) {
            self.animate_queue();
        }
    }

    /// Dequeue and play the next pending frame, or go idle. Batches without
    /// a lead transition finish immediately, so draining continues past them.
    pub fn animate_queue(&mut self) {
        while !self.queue.is_running() {
            let Some(frame) = self.queue.pop() else {
                debug!("animation queue drained");
                return;
            };
            self.dispatch(frame);
        }
    }

    /// Move the view one frame back. Returns false at the first frame.
    pub fn step_back(&mut self) -> bool {
        if self.cursor == 0 || self.store.is_empty() {
            return false;
        }
        self.cursor -= 1;
        self.submit(self.cursor);
        true
    }

    /// Move the view one frame forward, or report that a fetch is needed.
    pub fn step_forward(&mut self) -> Step {
        match self.store.last_frame() {
            Some(last) if self.cursor < last => {
                self.cursor += 1;
                self.submit(self.cursor);
                Step::Redisplay(self.cursor)
            }
            _ => Step::NeedsFetch,
        }
    }

    fn dispatch(&mut self, frame: usize) {
        if let Some(batch) = self.animate(frame) {
            debug!(
                frame,
                moved = batch.transitions(),
                created = batch.created.len(),
                deleted = batch.deleted.len(),
                duration_ms = batch.duration_ms,
                "dispatched batch"
            );
        }
    }

    fn animate_queue_if_idle(&mut self) {
        if !self.queue.is_running() && !self.queue.is_empty() {
            self.animate_queue();
        }
    }
}

impl Visualizer<Scene> {
    /// Advance the tween engine to `now` and feed completions back into the
    /// queue. Returns the number of transitions that finished.
    pub fn tick(&mut self, now: f64) -> usize {
        let done = self.stage.advance(now);
        for transition in &done {
            self.on_complete(*transition);
        }
        done.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use protocol::{DropletId, DropletInfo, Location};

    fn snap(droplets: &[(u64, i32, i32)]) -> Snapshot {
        Snapshot::new(
            droplets
                .iter()
                .map(|&(id, y, x)| DropletInfo::new(id, Location::new(y, x), 1.0))
                .collect(),
        )
        .unwrap()
    }

    fn visualizer() -> Visualizer {
        Visualizer::new(VisConfig::default(), Scene::new())
    }

    fn sprite_of(vis: &Visualizer, id: u64) -> crate::render::SpriteId {
        vis.registry().get(DropletId(id)).unwrap().sprite
    }

    #[test]
    fn test_first_snapshot_creates_without_transition() {
        let mut vis = visualizer();
        vis.parse_data(snap(&[(1, 0, 0)]));

        assert_eq!(vis.registry().len(), 1);
        assert_eq!(vis.stage().active_tweens(), 0);
        assert!(!vis.is_running());
        let sprite = sprite_of(&vis, 1);
        assert_eq!(vis.stage().position(sprite), Some(Vec2::new(0.0, 40.0)));
    }

    #[test]
    fn test_move_issues_lead_transition() {
        let mut vis = visualizer();
        vis.parse_data(snap(&[(1, 0, 0)]));
        vis.parse_data(snap(&[(1, 1, 0)]));

        let in_flight = vis.queue().in_flight().unwrap();
        assert_eq!(in_flight.frame, 1);
        let tween = vis.stage().tween(in_flight.lead).unwrap();
        assert_eq!(tween.from, Vec2::new(0.0, 40.0));
        assert_eq!(tween.to, Vec2::new(0.0, 80.0));
        assert_eq!(tween.duration_ms, 500.0);
        assert_eq!(vis.stage().active_tweens(), 1);
    }

    #[test]
    fn test_missing_droplet_is_deleted_once() {
        let mut vis = visualizer();
        vis.parse_data(snap(&[(1, 0, 0), (2, 0, 4)]));
        vis.parse_data(snap(&[(1, 0, 1)]));

        let two = vis.registry().get(DropletId(2)).unwrap();
        assert_eq!(two.state, HandleState::Deleted { since: 1 });
        assert!(!vis.stage().sprite(two.sprite).unwrap().visible);
        assert!(vis.is_running());

        // still absent in the next snapshot: no second deletion
        vis.tick(1_000.0);
        vis.parse_data(snap(&[(1, 0, 2)]));
        let two = vis.registry().get(DropletId(2)).unwrap();
        assert_eq!(two.state, HandleState::Deleted { since: 1 });
    }

    #[test]
    fn test_reappearing_droplet_is_revived_not_recreated() {
        let mut vis = visualizer();
        vis.parse_data(snap(&[(1, 0, 0), (2, 3, 3)]));
        let sprite = sprite_of(&vis, 2);

        vis.parse_data(snap(&[(1, 0, 1)]));
        vis.tick(1_000.0);

        let mut back = DropletInfo::new(2, Location::new(3, 5), 2.0);
        back.info = serde_json::json!("(c, d)");
        vis.parse_data(Snapshot::new(vec![back]).unwrap());

        let handle = vis.registry().get(DropletId(2)).unwrap();
        assert_eq!(handle.sprite, sprite);
        assert_eq!(handle.state, HandleState::Active);
        assert_eq!(handle.volume, 2.0);
        assert_eq!(handle.info, serde_json::json!("(c, d)"));
        assert!(vis.stage().sprite(sprite).unwrap().visible);
        assert_eq!(vis.stage().len(), 2);
        // revived droplet moves, so it carries the lead
        let lead = vis.queue().in_flight().unwrap().lead;
        assert_eq!(vis.stage().tween(lead).unwrap().to, Vec2::new(200.0, 160.0));
    }

    #[test]
    fn test_busy_snapshots_play_in_arrival_order() {
        let mut vis = visualizer();
        vis.parse_data(snap(&[(1, 0, 0)]));
        for x in 1..=4 {
            vis.parse_data(snap(&[(1, 0, x)]));
        }
        assert_eq!(vis.played(), &[1]);
        assert_eq!(vis.queue().pending().collect::<Vec<_>>(), vec![2, 3, 4]);

        let mut now = 0.0;
        while vis.is_running() {
            now += 1_000.0;
            vis.tick(now);
        }
        assert_eq!(vis.played(), &[1, 2, 3, 4]);
        assert_eq!(vis.dispatched(), 4);
        assert!(vis.queue().is_empty());
        let sprite = sprite_of(&vis, 1);
        assert_eq!(vis.stage().position(sprite), Some(Vec2::new(160.0, 40.0)));
    }

    #[test]
    fn test_backlog_shortens_duration() {
        let mut vis = visualizer();
        vis.parse_data(snap(&[(1, 0, 0)]));
        vis.parse_data(snap(&[(1, 0, 1)]));
        vis.parse_data(snap(&[(1, 0, 2)]));
        vis.parse_data(snap(&[(1, 0, 3)]));

        // first batch done; two queued, frame 2 dequeued with one still behind it
        vis.tick(500.0);
        let lead = vis.queue().in_flight().unwrap().lead;
        assert_eq!(vis.stage().tween(lead).unwrap().duration_ms, 250.0);
    }

    #[test]
    fn test_never_two_batches_in_flight() {
        let mut vis = visualizer();
        vis.parse_data(snap(&[(1, 0, 0), (2, 4, 4)]));
        vis.parse_data(snap(&[(1, 0, 1), (2, 4, 5)]));
        let first = vis.queue().in_flight().unwrap();

        // arrivals while busy only queue
        vis.parse_data(snap(&[(1, 0, 2), (2, 4, 6)]));
        assert_eq!(vis.played(), &[1]);
        assert_eq!(vis.queue().in_flight(), Some(first));
        assert_eq!(vis.queue().len(), 1);

        vis.tick(500.0);
        assert_eq!(vis.played(), &[1, 2]);
        assert_eq!(vis.queue().in_flight().map(|b| b.frame), Some(2));
    }

    #[test]
    fn test_lead_is_first_moving_droplet_in_order() {
        let mut vis = visualizer();
        vis.parse_data(snap(&[(7, 0, 0)]));
        // 9 is new (no transition), 7 moves: 7 carries the lead
        vis.parse_data(snap(&[(9, 5, 5), (7, 1, 1)]));
        let lead = vis.queue().in_flight().unwrap().lead;
        let sprite = sprite_of(&vis, 7);
        assert_eq!(vis.stage().tween(lead).unwrap().to, vis.config().pixel_position(Location::new(1, 1)));
        assert_eq!(vis.stage().position(sprite), Some(Vec2::new(0.0, 40.0)));
    }

    #[test]
    fn test_all_new_batch_does_not_stall() {
        let mut vis = visualizer();
        vis.parse_data(snap(&[(1, 0, 0)]));
        vis.parse_data(snap(&[(1, 0, 1)]));
        // queued behind the running batch: only new droplets
        vis.parse_data(snap(&[(5, 2, 2)]));
        vis.parse_data(snap(&[(5, 2, 3)]));

        vis.tick(500.0);
        // frame 2 had no lead, frame 3 played right after it
        assert_eq!(vis.played(), &[1, 2, 3]);
        assert_eq!(vis.queue().in_flight().map(|b| b.frame), Some(3));
    }

    #[test]
    fn test_step_navigation() {
        let mut vis = visualizer();
        assert!(!vis.step_back());
        assert_eq!(vis.step_forward(), Step::NeedsFetch);

        vis.parse_data(snap(&[(1, 0, 0)]));
        vis.parse_data(snap(&[(1, 0, 3)]));
        vis.tick(1_000.0);
        assert_eq!(vis.cursor(), 1);
        assert_eq!(vis.step_forward(), Step::NeedsFetch);

        assert!(vis.step_back());
        assert_eq!(vis.cursor(), 0);
        assert!(!vis.step_back());
        // redisplay of frame 0 animates back to column 0
        let lead = vis.queue().in_flight().unwrap().lead;
        assert_eq!(vis.stage().tween(lead).unwrap().to, Vec2::new(0.0, 40.0));

        assert_eq!(vis.step_forward(), Step::Redisplay(1));
        assert_eq!(vis.queue().pending().collect::<Vec<_>>(), vec![1]);
        vis.tick(2_000.0);
        vis.tick(3_000.0);
        assert_eq!(vis.played(), &[1, 0, 1]);
        assert_eq!(vis.store().len(), 2);
    }

    #[test]
    fn test_live_arrival_follows_tail() {
        let mut vis = visualizer();
        vis.parse_data(snap(&[(1, 0, 0)]));
        vis.parse_data(snap(&[(1, 0, 1)]));
        vis.tick(1_000.0);
        vis.step_back();
        vis.tick(2_000.0);
        assert_eq!(vis.cursor(), 0);

        vis.parse_data(snap(&[(1, 0, 2)]));
        assert_eq!(vis.cursor(), 2);
        assert_eq!(vis.queue().in_flight().map(|b| b.frame), Some(2));
    }

    #[test]
    fn test_eviction_when_configured() {
        let config = VisConfig {
            evict_after_generations: Some(1),
            ..VisConfig::default()
        };
        let mut vis = Visualizer::new(config, Scene::new());
        vis.parse_data(snap(&[(1, 0, 0), (2, 5, 5)]));
        vis.parse_data(snap(&[(1, 0, 1)]));
        vis.tick(1_000.0);
        vis.parse_data(snap(&[(1, 0, 2)]));
        vis.tick(2_000.0);
        assert!(vis.registry().contains(DropletId(2)));
        vis.parse_data(snap(&[(1, 0, 3)]));
        assert!(!vis.registry().contains(DropletId(2)));
        assert_eq!(vis.stage().len(), 1);
    }
}
