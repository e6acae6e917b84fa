//! The droplet board: a grid of droplets changed one action at a time.

use std::collections::BTreeMap;

use protocol::{DropletId, DropletInfo, Location, Snapshot};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, trace};

use crate::action::Action;
use crate::error::BoardError;

const LEFT: Location = Location::new(0, -1);
const RIGHT: Location = Location::new(0, 1);

#[derive(Debug, Clone, PartialEq)]
pub struct Droplet {
    pub id: DropletId,
    pub location: Location,
    pub volume: f64,
    pub info: String,
    /// Droplets sharing a group never collide with each other.
    pub collision_group: u64,
}

impl Droplet {
    fn describe(&self) -> DropletInfo {
        DropletInfo {
            info: serde_json::Value::String(self.info.clone()),
            ..DropletInfo::new(self.id.0, self.location, self.volume)
        }
    }
}

/// Normal noise applied to the halves of a split.
struct SplitError {
    dist: Normal<f64>,
    rng: StdRng,
}

pub struct Board {
    width: i32,
    height: i32,
    droplets: BTreeMap<DropletId, Droplet>,
    next_id: u64,
    split_error: Option<SplitError>,
}

impl Board {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as i32,
            height: height as i32,
            droplets: BTreeMap::new(),
            next_id: 1,
            split_error: None,
        }
    }

    /// Perturb split volumes with N(0, stdev). A zero stdev keeps splits exact.
    pub fn with_split_error(mut self, stdev: f64, seed: Option<u64>) -> Result<Self, BoardError> {
        if stdev == 0.0 {
            self.split_error = None;
            return Ok(self);
        }
        let dist = Normal::new(0.0, stdev)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.split_error = Some(SplitError { dist, rng });
        Ok(self)
    }

    pub fn width(&self) -> u32 {
        self.width as u32
    }

    pub fn height(&self) -> u32 {
        self.height as u32
    }

    pub fn len(&self) -> usize {
        self.droplets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.droplets.is_empty()
    }

    pub fn get(&self, id: DropletId) -> Option<&Droplet> {
        self.droplets.get(&id)
    }

    pub fn droplets(&self) -> impl Iterator<Item = &Droplet> {
        self.droplets.values()
    }

    pub fn in_bounds(&self, loc: Location) -> bool {
        (0..self.height).contains(&loc.y) && (0..self.width).contains(&loc.x)
    }

    /// Current state, ordered by id.
    pub fn snapshot(&self) -> Result<Snapshot, BoardError> {
        Ok(Snapshot::new(self.droplets.values().map(Droplet::describe).collect())?)
    }

    pub fn execute(&mut self, action: &Action) -> Result<(), BoardError> {
        trace!(?action, "execute");
        match action {
            Action::AddDroplet { location, volume, info } => {
                let location = self.checked(*location)?;
                let id = self.alloc();
                let info = info.clone().unwrap_or_else(|| id.to_string());
                self.insert(Droplet {
                    id,
                    location,
                    volume: *volume,
                    info,
                    collision_group: id.0,
                });
            }
            Action::RemoveDroplet { id } => {
                self.take(*id)?;
                debug!(%id, "droplet removed");
            }
            Action::MoveDroplet { id, location } => {
                let to = self.checked(*location)?;
                let droplet = self
                    .droplets
                    .get_mut(id)
                    .ok_or(BoardError::UnknownDroplet(*id))?;
                if droplet.location.distance_to(&to) > 1 {
                    return Err(BoardError::IllegalMove {
                        id: *id,
                        from: droplet.location,
                        to,
                    });
                }
                droplet.location = to;
            }
            Action::UpdateDroplet { old_id, new_id } => {
                if self.droplets.contains_key(new_id) {
                    return Err(BoardError::DuplicateId(*new_id));
                }
                let mut droplet = self.take(*old_id)?;
                droplet.id = *new_id;
                self.next_id = self.next_id.max(new_id.0 + 1);
                debug!(old = %old_id, new = %new_id, "droplet renamed");
                self.insert(droplet);
            }
            Action::Mix { a, b } => self.mix(*a, *b)?,
            Action::Split { id } => self.split(*id)?,
            Action::Tick => self.check_collisions()?,
        }
        Ok(())
    }

    fn mix(&mut self, a: DropletId, b: DropletId) -> Result<(), BoardError> {
        let da = self.get(a).ok_or(BoardError::UnknownDroplet(a))?;
        let db = self.get(b).ok_or(BoardError::UnknownDroplet(b))?;
        if a == b || !da.location.is_neighbor(&db.location) {
            return Err(BoardError::TooFarToMix(a, b));
        }
        let da = self.take(a)?;
        let db = self.take(b)?;
        let id = self.alloc();
        debug!(%a, %b, %id, "mix");
        self.insert(Droplet {
            id,
            location: db.location,
            volume: da.volume + db.volume,
            info: format!("({}, {})", da.info, db.info),
            collision_group: id.0,
        });
        Ok(())
    }

    fn split(&mut self, id: DropletId) -> Result<(), BoardError> {
        let parent = self.get(id).ok_or(BoardError::UnknownDroplet(id))?;
        let left = self.checked(parent.location.offset(LEFT))?;
        let right = self.checked(parent.location.offset(RIGHT))?;

        let half = parent.volume / 2.0;
        let error = match &mut self.split_error {
            Some(e) => e.dist.sample(&mut e.rng).clamp(-half, half),
            None => 0.0,
        };

        let parent = self.take(id)?;
        let left_id = self.alloc();
        let right_id = self.alloc();
        debug!(%id, left = %left_id, right = %right_id, error, "split");
        self.insert(Droplet {
            id: left_id,
            location: left,
            volume: half + error,
            info: parent.info.clone(),
            collision_group: parent.collision_group,
        });
        self.insert(Droplet {
            id: right_id,
            location: right,
            volume: half - error,
            info: parent.info,
            collision_group: parent.collision_group,
        });
        Ok(())
    }

    /// Droplets in neighbouring cells, diagonals included, would merge on
    /// their own unless they share a collision group.
    fn check_collisions(&self) -> Result<(), BoardError> {
        let droplets: Vec<&Droplet> = self.droplets.values().collect();
        for (i, a) in droplets.iter().enumerate() {
            for b in &droplets[i + 1..] {
                if a.collision_group == b.collision_group {
                    continue;
                }
                if a.location.is_neighbor(&b.location) {
                    return Err(BoardError::Collision(a.id, b.id));
                }
            }
        }
        Ok(())
    }

    fn checked(&self, loc: Location) -> Result<Location, BoardError> {
        if self.in_bounds(loc) {
            Ok(loc)
        } else {
            Err(BoardError::OutOfBounds(loc))
        }
    }

    fn alloc(&mut self) -> DropletId {
        let id = DropletId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, droplet: Droplet) {
        self.droplets.insert(droplet.id, droplet);
    }

    fn take(&mut self, id: DropletId) -> Result<Droplet, BoardError> {
        self.droplets.remove(&id).ok_or(BoardError::UnknownDroplet(id))
    }
}
