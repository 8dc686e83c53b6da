use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::graph::VersionNode;
use crate::ids::{RoomId, Timestamp, VersionId};

/// Pluggable time source for version timestamps.
pub trait Clock {
    fn now(&mut self) -> Timestamp;
}

/// Wall-clock milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&mut self) -> Timestamp {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Counter-based clock; every call advances by `step`. Deterministic, for tests and replay.
#[derive(Clone, Debug)]
pub struct LogicalClock {
    counter: Timestamp,
    step: Timestamp,
}

impl LogicalClock {
    pub fn new(start: Timestamp, step: Timestamp) -> Self {
        Self {
            counter: start,
            step,
        }
    }

    /// A clock that reports the same instant forever.
    pub fn frozen(at: Timestamp) -> Self {
        Self::new(at, 0)
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl Clock for LogicalClock {
    fn now(&mut self) -> Timestamp {
        self.counter += self.step;
        self.counter
    }
}

/// Append-only persistence for version nodes, partitioned by room.
pub trait VersionStore {
    /// Persist `node`. Returns `false` when `(room, node.version_id)` was already stored.
    fn append(&mut self, room: &RoomId, node: &VersionNode) -> Result<bool>;
    /// Every node of `room`, ordered by `seq`.
    fn load_room(&self, room: &RoomId) -> Result<Vec<VersionNode>>;
    fn get(&self, room: &RoomId, id: &VersionId) -> Result<Option<VersionNode>>;
    fn rooms(&self) -> Result<Vec<RoomId>>;
}

/// In-memory store for tests and single-process deployments.
///
/// Clones share the same underlying map.
#[derive(Clone, Debug, Default)]
pub struct MemoryVersionStore {
    rooms: Arc<Mutex<HashMap<RoomId, Vec<VersionNode>>>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<RoomId, Vec<VersionNode>>>> {
        self.rooms
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }
}

impl VersionStore for MemoryVersionStore {
    fn append(&mut self, room: &RoomId, node: &VersionNode) -> Result<bool> {
        let mut rooms = self.lock()?;
        let nodes = rooms.entry(room.clone()).or_default();
        if nodes.iter().any(|n| n.version_id == node.version_id) {
            return Ok(false);
        }
        nodes.push(node.clone());
        Ok(true)
    }

    fn load_room(&self, room: &RoomId) -> Result<Vec<VersionNode>> {
        let rooms = self.lock()?;
        let mut nodes = rooms.get(room).cloned().unwrap_or_default();
        nodes.sort_by_key(|n| n.seq);
        Ok(nodes)
    }

    fn get(&self, room: &RoomId, id: &VersionId) -> Result<Option<VersionNode>> {
        let rooms = self.lock()?;
        Ok(rooms
            .get(room)
            .and_then(|nodes| nodes.iter().find(|n| &n.version_id == id))
            .cloned())
    }

    fn rooms(&self) -> Result<Vec<RoomId>> {
        let rooms = self.lock()?;
        let mut ids: Vec<RoomId> = rooms.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AuthorId;
    use crate::ops::{normalize, Operation};

    fn node(id: &str, seq: u64) -> VersionNode {
        VersionNode {
            version_id: VersionId::from(id),
            parent_id: None,
            timestamp: seq as Timestamp,
            author_id: AuthorId::from("ada"),
            operations: normalize(vec![Operation::insert("x")]),
            seq,
        }
    }

    #[test]
    fn logical_clock_advances_by_step() {
        let mut clock = LogicalClock::new(10, 5);
        assert_eq!(clock.now(), 15);
        assert_eq!(clock.now(), 20);
        let mut frozen = LogicalClock::frozen(7);
        assert_eq!(frozen.now(), 7);
        assert_eq!(frozen.now(), 7);
    }

    #[test]
    fn memory_store_append_is_idempotent() {
        let mut store = MemoryVersionStore::new();
        let room = RoomId::from("r");
        assert!(store.append(&room, &node("a", 0)).unwrap());
        assert!(!store.append(&room, &node("a", 0)).unwrap());
        assert_eq!(store.load_room(&room).unwrap().len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let mut store = MemoryVersionStore::new();
        let view = store.clone();
        let room = RoomId::from("r");
        store.append(&room, &node("a", 0)).unwrap();
        assert!(view.get(&room, &VersionId::from("a")).unwrap().is_some());
        assert_eq!(view.rooms().unwrap(), vec![room]);
    }
}
