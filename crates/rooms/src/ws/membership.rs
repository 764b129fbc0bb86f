//! Live room membership tracking
//!
//! The connected set here is an ephemeral view of who currently holds an open
//! channel into a room. It is distinct from the durable participant roster
//! owned by the room service. Each room gets one lock-guarded state slot; all
//! voting state for the room lives in that slot, so evicting an emptied room
//! drops the session with it.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use crate::voting::VotingSession;

/// Mutable per-room state, guarded by the room's lock
#[derive(Debug, Default)]
pub struct RoomState {
    /// Users currently attached via an open channel
    pub connected: HashSet<String>,
    /// Active voting session, if one has been started
    pub session: Option<VotingSession>,
}

/// Tracker for connected room membership, keyed by room id
pub struct MembershipTracker {
    rooms: DashMap<String, Arc<Mutex<RoomState>>>,
}

impl MembershipTracker {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Run `f` on the room's state with `user_id` added to the connected set,
    /// creating the slot on first join.
    ///
    /// The map entry is held for the whole call, so the insert cannot
    /// interleave with `evict_if_empty` dropping the slot and stranding the
    /// joiner in a state no lookup can reach.
    pub fn join<T>(&self, room_id: &str, user_id: &str, f: impl FnOnce(&RoomState) -> T) -> T {
        let slot = self.rooms.entry(room_id.to_string()).or_default();
        let mut state = slot.lock();
        state.connected.insert(user_id.to_string());
        f(&state)
    }

    /// State slot for a room, without creating one.
    pub fn get(&self, room_id: &str) -> Option<Arc<Mutex<RoomState>>> {
        self.rooms.get(room_id).map(|entry| entry.value().clone())
    }

    /// Drop the room entry if its connected set is empty.
    ///
    /// Membership emptiness is the sole eviction trigger for room-scoped
    /// state; the voting session is discarded along with the entry.
    pub fn evict_if_empty(&self, room_id: &str) -> bool {
        self.rooms
            .remove_if(room_id, |_, slot| slot.lock().connected.is_empty())
            .is_some()
    }

    /// Rooms the user is currently connected to.
    pub fn rooms_of(&self, user_id: &str) -> Vec<String> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().lock().connected.contains(user_id))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of users currently connected to a room.
    pub fn connected_count(&self, room_id: &str) -> usize {
        self.get(room_id)
            .map(|slot| slot.lock().connected.len())
            .unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for MembershipTracker {
    fn default() -> Self {
        Self::new()
    }
}
