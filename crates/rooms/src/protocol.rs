//! Wire protocol for room WebSocket connections
//!
//! Typed JSON messages exchanged with clients, plus the domain types they
//! carry. Tag strings are part of the public contract with the mobile apps.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single vote on a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Like,
    Dislike,
}

/// One movie proposed for group voting within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub movie_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    pub group_score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub participants_who_liked: Vec<String>,
}

/// Durable room lifecycle status, owned by the room service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Active,
    Processing,
    Completed,
    Inactive,
}

/// Participant of record in a room's durable roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomParticipant {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_owner: bool,
}

/// Final outcome of a voting session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingResult {
    pub room_id: String,
    pub winner: Candidate,
    pub score: f64,
    pub all_scores: HashMap<String, f64>,
    pub total_participants: usize,
}

/// Messages received from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "vote")]
    Vote { movie_id: String, vote: VoteValue },

    #[serde(rename = "start_voting")]
    StartVoting,

    #[serde(rename = "get_room_status")]
    GetRoomStatus,

    #[serde(rename = "ping")]
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
}

/// Messages delivered to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "room_joined")]
    RoomJoined { room_id: String, message: String },

    #[serde(rename = "user_joined")]
    UserJoined {
        user_id: String,
        room_id: String,
        participant_count: usize,
    },

    #[serde(rename = "user_left")]
    UserLeft {
        user_id: String,
        room_id: String,
        participant_count: usize,
    },

    /// Snapshot unicast to a user right after joining
    #[serde(rename = "room_state")]
    RoomState {
        room_id: String,
        status: RoomStatus,
        participants: Vec<RoomParticipant>,
    },

    /// On-demand status report
    #[serde(rename = "room_status")]
    RoomStatusReport {
        room_id: String,
        status: RoomStatus,
        participants: Vec<RoomParticipant>,
        current_participants: usize,
        max_participants: u32,
    },

    #[serde(rename = "current_movie")]
    CurrentMovie {
        room_id: String,
        movie: Candidate,
        /// 1-based position within the ballot
        movie_index: usize,
        total_movies: usize,
    },

    /// Live tally echo, sent to everyone except the voter
    #[serde(rename = "vote_recorded")]
    VoteRecorded {
        room_id: String,
        user_id: String,
        movie_id: String,
        vote: VoteValue,
    },

    /// Ack unicast to the voter
    #[serde(rename = "vote_confirmed")]
    VoteConfirmed { movie_id: String, vote: VoteValue },

    #[serde(rename = "voting_result")]
    VotingResult {
        room_id: String,
        winner: Candidate,
        score: f64,
        all_scores: HashMap<String, f64>,
        total_participants: usize,
    },

    /// Push of a freshly generated candidate list to a room
    #[serde(rename = "group_recommendations")]
    GroupRecommendations {
        room_id: String,
        recommendations: Vec<Candidate>,
        participant_count: usize,
    },

    #[serde(rename = "pong")]
    Pong {
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    /// Serialize to JSON text for WebSocket transmission
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl From<&VotingResult> for ServerMessage {
    fn from(result: &VotingResult) -> Self {
        Self::VotingResult {
            room_id: result.room_id.clone(),
            winner: result.winner.clone(),
            score: result.score,
            all_scores: result.all_scores.clone(),
            total_participants: result.total_participants,
        }
    }
}
