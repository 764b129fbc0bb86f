//! Boundary to the durable room collaborator
//!
//! The rooms service trusts the platform's room service for ownership,
//! rosters, and the ranked candidate lists produced by the recommendation
//! pipeline. This module only defines the contract surface plus an in-memory
//! implementation for local runs and tests.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::protocol::{Candidate, RoomParticipant, RoomStatus};

/// Durable room profile as owned by the external room service
#[derive(Debug, Clone)]
pub struct RoomProfile {
    pub room_id: String,
    pub owner_id: String,
    pub status: RoomStatus,
    pub max_participants: u32,
    pub participants: Vec<RoomParticipant>,
}

impl RoomProfile {
    /// Whether the user is a participant of record (not necessarily connected).
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

/// Read access to durable room data
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Durable room profile, `None` when the room does not exist.
    async fn room(&self, room_id: &str) -> Result<Option<RoomProfile>>;

    /// Latest ranked candidate list produced for the room. Empty when the
    /// recommendation pipeline has not run yet.
    async fn room_recommendations(&self, room_id: &str) -> Result<Vec<Candidate>>;
}

/// In-memory directory for local runs and tests
#[derive(Default)]
pub struct InMemoryRoomDirectory {
    rooms: DashMap<String, RoomProfile>,
    recommendations: DashMap<String, Vec<Candidate>>,
}

impl InMemoryRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_room(&self, profile: RoomProfile) {
        self.rooms.insert(profile.room_id.clone(), profile);
    }

    pub fn insert_recommendations(&self, room_id: &str, candidates: Vec<Candidate>) {
        self.recommendations.insert(room_id.to_string(), candidates);
    }
}

#[async_trait]
impl RoomDirectory for InMemoryRoomDirectory {
    async fn room(&self, room_id: &str) -> Result<Option<RoomProfile>> {
        Ok(self.rooms.get(room_id).map(|entry| entry.value().clone()))
    }

    async fn room_recommendations(&self, room_id: &str) -> Result<Vec<Candidate>> {
        Ok(self
            .recommendations
            .get(room_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}
