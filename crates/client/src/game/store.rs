// Append-only snapshot history, addressed by frame index
use protocol::Snapshot;

#[derive(Debug, Default)]
pub struct SnapshotStore {
    frames: Vec<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and return the new snapshot's frame index.
    pub fn append(&mut self, snapshot: Snapshot) -> usize {
        self.frames.push(snapshot);
        self.frames.len() - 1
    }

    /// `None` when `frame` is outside `[0, len - 1]`.
    #[inline]
    pub fn get(&self, frame: usize) -> Option<&Snapshot> {
        self.frames.get(frame)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the newest snapshot (the live tail).
    #[inline]
    pub fn last_frame(&self) -> Option<usize> {
        self.frames.len().checked_sub(1)
    }
}
