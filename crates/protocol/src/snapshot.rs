//! A snapshot is one server-reported state of every droplet on the board.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{DropletId, DropletInfo, ProtocolError};

/// Ordered sequence of droplet descriptors. Order is significant: the client
/// picks its lead transition positionally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Vec<DropletInfo>);

impl Snapshot {
    /// Build a snapshot, rejecting repeated ids.
    pub fn new(droplets: Vec<DropletInfo>) -> Result<Self, ProtocolError> {
        let mut seen = HashSet::with_capacity(droplets.len());
        for d in &droplets {
            if !seen.insert(d.id) {
                return Err(ProtocolError::DuplicateId(d.id));
            }
        }
        Ok(Self(droplets))
    }

    /// Decode the `GET /state` response body.
    pub fn from_json(body: &str) -> Result<Self, ProtocolError> {
        let droplets: Vec<DropletInfo> = serde_json::from_str(body)?;
        Self::new(droplets)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(&self.0)?)
    }

    pub fn ids(&self) -> HashSet<DropletId> {
        self.0.iter().map(|d| d.id).collect()
    }

    pub fn get(&self, id: DropletId) -> Option<&DropletInfo> {
        self.0.iter().find(|d| d.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DropletInfo> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a DropletInfo;
    type IntoIter = std::slice::Iter<'a, DropletInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
