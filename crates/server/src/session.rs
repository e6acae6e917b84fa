//! Scripted board sessions. Each call to [`Session::advance`] runs the
//! script up to its next tick and yields the board state at that point.

use std::collections::{HashMap, VecDeque};

use protocol::{DropletId, Location, Snapshot};
use tracing::{info, warn};

use crate::action::Action;
use crate::board::Board;
use crate::config::Config;
use crate::error::BoardError;

pub struct Session {
    board: Board,
    script: VecDeque<Action>,
    ticks: usize,
}

impl Session {
    pub fn new(board: Board, script: Vec<Action>) -> Self {
        Self {
            board,
            script: script.into(),
            ticks: 0,
        }
    }

    /// The demo session on a board built from `config`.
    pub fn from_config(config: &Config) -> Result<Self, BoardError> {
        let board = Board::new(config.board.width, config.board.height)
            .with_split_error(config.error.split_error_stdev, config.error.seed)?;
        let script = demo_script()?;
        info!(actions = script.len(), "demo script loaded");
        Ok(Self::new(board, script))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Snapshots produced so far.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }

    /// Run actions through the next tick. `Ok(None)` once the script is
    /// done. A failing action ends the session.
    pub fn advance(&mut self) -> Result<Option<Snapshot>, BoardError> {
        if self.script.is_empty() {
            return Ok(None);
        }
        while let Some(action) = self.script.pop_front() {
            if let Err(e) = self.board.execute(&action) {
                warn!(?action, "session aborted: {}", e);
                self.script.clear();
                return Err(e);
            }
            if action.is_tick() {
                break;
            }
        }
        self.ticks += 1;
        self.board.snapshot().map(Some)
    }
}

/// Straight-line path from `from` to `to`, row first, then column. The
/// start cell is excluded, the destination included.
pub fn route(from: Location, to: Location) -> Vec<Location> {
    let mut path = Vec::with_capacity(from.distance_to(&to) as usize);
    let mut at = from;
    while at.y != to.y {
        at.y += (to.y - at.y).signum();
        path.push(at);
    }
    while at.x != to.x {
        at.x += (to.x - at.x).signum();
        path.push(at);
    }
    path
}

/// Builds a script while tracking where each droplet will be. Ids are
/// allocated in the same order the board allocates them.
pub struct ScriptBuilder {
    actions: Vec<Action>,
    locations: HashMap<DropletId, Location>,
    next_id: u64,
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            locations: HashMap::new(),
            next_id: 1,
        }
    }

    fn alloc(&mut self) -> DropletId {
        let id = DropletId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn location(&self, id: DropletId) -> Option<Location> {
        self.locations.get(&id).copied()
    }

    fn locate(&self, id: DropletId) -> Result<Location, BoardError> {
        self.location(id).ok_or(BoardError::UnknownDroplet(id))
    }

    /// Dispense a droplet. Does not end the step.
    pub fn input(&mut self, location: Location, volume: f64, info: &str) -> DropletId {
        let id = self.alloc();
        self.actions.push(Action::AddDroplet {
            location,
            volume,
            info: Some(info.to_string()),
        });
        self.locations.insert(id, location);
        id
    }

    pub fn tick(&mut self) -> &mut Self {
        self.actions.push(Action::Tick);
        self
    }

    /// Walk `id` to `to`, one step per tick.
    pub fn move_to(&mut self, id: DropletId, to: Location) -> Result<(), BoardError> {
        let from = self.locate(id)?;
        for step in route(from, to) {
            self.actions.push(Action::MoveDroplet { id, location: step });
            self.tick();
        }
        self.locations.insert(id, to);
        Ok(())
    }

    /// Walk `a` toward `b` and mix them as soon as they are neighbours.
    pub fn mix(&mut self, a: DropletId, b: DropletId) -> Result<DropletId, BoardError> {
        let from = self.locate(a)?;
        let target = self.locate(b)?;
        let mut path = route(from, target);
        let stop = path
            .iter()
            .position(|step| step.is_neighbor(&target))
            .map_or(0, |i| i + 1);
        if from.is_neighbor(&target) {
            path.clear();
        } else {
            path.truncate(stop);
        }

        let last = path.len();
        for (i, step) in path.into_iter().enumerate() {
            self.actions.push(Action::MoveDroplet { id: a, location: step });
            if i + 1 < last {
                self.tick();
            }
        }
        self.actions.push(Action::Mix { a, b });
        self.tick();

        self.locations.remove(&a);
        self.locations.remove(&b);
        let id = self.alloc();
        self.locations.insert(id, target);
        Ok(id)
    }

    pub fn split(&mut self, id: DropletId) -> Result<(DropletId, DropletId), BoardError> {
        let at = self.locate(id)?;
        self.locations.remove(&id);
        self.actions.push(Action::Split { id });
        self.tick();

        let left = self.alloc();
        let right = self.alloc();
        self.locations.insert(left, at.offset(Location::new(0, -1)));
        self.locations.insert(right, at.offset(Location::new(0, 1)));
        Ok((left, right))
    }

    /// Rename `id` to the next free id.
    pub fn rename(&mut self, id: DropletId) -> Result<DropletId, BoardError> {
        let at = self.locate(id)?;
        self.locations.remove(&id);
        let new_id = self.alloc();
        self.actions.push(Action::UpdateDroplet { old_id: id, new_id });
        self.tick();
        self.locations.insert(new_id, at);
        Ok(new_id)
    }

    pub fn remove(&mut self, id: DropletId) -> Result<(), BoardError> {
        self.locate(id)?;
        self.locations.remove(&id);
        self.actions.push(Action::RemoveDroplet { id });
        self.tick();
        Ok(())
    }

    pub fn build(self) -> Vec<Action> {
        self.actions
    }
}

/// Three inputs; mix two, split the product, fold both halves back in with
/// the third, then dispose of the result.
pub fn demo_script() -> Result<Vec<Action>, BoardError> {
    let mut script = ScriptBuilder::new();
    let a = script.input(Location::new(1, 1), 1.0, "a");
    let b = script.input(Location::new(1, 5), 1.0, "b");
    let c = script.input(Location::new(6, 1), 1.0, "c");
    script.tick();

    let ab = script.mix(a, b)?;
    let (left, right) = script.split(ab)?;
    let abc = script.mix(left, c)?;
    let all = script.mix(right, abc)?;
    script.remove(all)?;
    Ok(script.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_row_then_column() {
        let path = route(Location::new(0, 0), Location::new(2, 1));
        assert_eq!(
            path,
            vec![Location::new(1, 0), Location::new(2, 0), Location::new(2, 1)]
        );
        assert!(route(Location::new(3, 3), Location::new(3, 3)).is_empty());
    }

    #[test]
    fn test_route_goes_backwards() {
        let path = route(Location::new(2, 2), Location::new(0, 1));
        assert_eq!(
            path,
            vec![Location::new(1, 2), Location::new(0, 2), Location::new(0, 1)]
        );
    }

    #[test]
    fn test_advance_stops_at_each_tick() {
        let board = Board::new(4, 4);
        let script = vec![
            Action::AddDroplet { location: Location::new(0, 0), volume: 1.0, info: None },
            Action::Tick,
            Action::MoveDroplet { id: DropletId(1), location: Location::new(0, 1) },
            Action::Tick,
        ];
        let mut session = Session::new(board, script);

        let first = session.advance().unwrap().unwrap();
        assert_eq!(first.get(DropletId(1)).unwrap().location, Location::new(0, 0));
        let second = session.advance().unwrap().unwrap();
        assert_eq!(second.get(DropletId(1)).unwrap().location, Location::new(0, 1));
        assert!(session.advance().unwrap().is_none());
        assert_eq!(session.ticks(), 2);
    }

    #[test]
    fn test_failed_action_ends_session() {
        let board = Board::new(4, 4);
        let script = vec![
            Action::RemoveDroplet { id: DropletId(9) },
            Action::Tick,
            Action::Tick,
        ];
        let mut session = Session::new(board, script);
        assert!(matches!(session.advance(), Err(BoardError::UnknownDroplet(_))));
        assert!(session.is_exhausted());
        assert!(session.advance().unwrap().is_none());
    }

    #[test]
    fn test_builder_ids_match_board() {
        let mut script = ScriptBuilder::new();
        let a = script.input(Location::new(0, 0), 1.0, "a");
        let b = script.input(Location::new(0, 3), 1.0, "b");
        script.tick();
        let ab = script.mix(a, b).unwrap();
        let (l, r) = script.split(ab).unwrap();

        let mut session = Session::new(Board::new(8, 8), script.build());
        let mut last = None;
        while let Some(snapshot) = session.advance().unwrap() {
            last = Some(snapshot);
        }
        let last = last.unwrap();
        assert_eq!(ab, DropletId(3));
        assert_eq!(last.get(l).unwrap().location, Location::new(0, 2));
        assert_eq!(last.get(r).unwrap().location, Location::new(0, 4));
    }

    #[test]
    fn test_builder_stops_at_first_neighbour() {
        let mut script = ScriptBuilder::new();
        let a = script.input(Location::new(0, 0), 1.0, "a");
        let b = script.input(Location::new(3, 1), 1.0, "b");
        script.tick();
        script.mix(a, b).unwrap();

        let moves: Vec<_> = script
            .build()
            .into_iter()
            .filter_map(|action| match action {
                Action::MoveDroplet { location, .. } => Some(location),
                _ => None,
            })
            .collect();
        // (2, 0) already touches (3, 1) diagonally
        assert_eq!(moves, vec![Location::new(1, 0), Location::new(2, 0)]);
    }

    #[test]
    fn test_builder_rejects_unknown_droplet() {
        let mut script = ScriptBuilder::new();
        let a = script.input(Location::new(0, 0), 1.0, "a");
        assert!(matches!(
            script.mix(a, DropletId(42)),
            Err(BoardError::UnknownDroplet(DropletId(42)))
        ));
        assert!(script.split(DropletId(7)).is_err());
    }

    #[test]
    fn test_rename_shows_as_new_id() {
        let mut script = ScriptBuilder::new();
        let a = script.input(Location::new(2, 2), 1.0, "a");
        script.tick();
        let renamed = script.rename(a).unwrap();
        let mut session = Session::new(Board::new(8, 8), script.build());

        let before = session.advance().unwrap().unwrap();
        let after = session.advance().unwrap().unwrap();
        assert!(before.get(a).is_some());
        assert!(after.get(a).is_none());
        assert_eq!(after.get(renamed).unwrap().location, Location::new(2, 2));
        assert_eq!(renamed, DropletId(2));
    }

    #[test]
    fn test_demo_runs_to_completion() {
        let mut session = Session::new(Board::new(12, 8), demo_script().unwrap());
        let mut snapshots = Vec::new();
        while let Some(snapshot) = session.advance().unwrap() {
            snapshots.push(snapshot);
        }

        assert_eq!(snapshots.len(), 22);
        assert_eq!(snapshots[0].len(), 3);
        let product = &snapshots[20];
        assert_eq!(product.len(), 1);
        let droplet = product.get(DropletId(8)).unwrap();
        assert_eq!(droplet.volume, 3.0);
        assert_eq!(droplet.location, Location::new(6, 1));
        assert!(snapshots[21].is_empty());
    }

    #[test]
    fn test_from_config() {
        let session = Session::from_config(&Config::default()).unwrap();
        assert_eq!(session.board().width(), 12);
        assert!(!session.is_exhausted());
    }
}
