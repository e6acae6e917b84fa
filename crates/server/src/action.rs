//! Board actions a session script is made of.

use protocol::{DropletId, Location};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Dispense a new droplet. Its id is the next one the board allocates.
    AddDroplet {
        location: Location,
        volume: f64,
        info: Option<String>,
    },
    RemoveDroplet {
        id: DropletId,
    },
    /// Give a droplet a new id. Clients see the old id vanish and the new
    /// one appear.
    UpdateDroplet {
        old_id: DropletId,
        new_id: DropletId,
    },
    /// Move one cell (or stay put).
    MoveDroplet {
        id: DropletId,
        location: Location,
    },
    /// Merge `a` into a neighbouring `b`; the product sits where `b` was.
    Mix {
        a: DropletId,
        b: DropletId,
    },
    Split {
        id: DropletId,
    },
    /// End of a step: check collisions and publish a snapshot.
    Tick,
}

impl Action {
    pub fn is_tick(&self) -> bool {
        matches!(self, Action::Tick)
    }
}
