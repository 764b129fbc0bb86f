//! CineMatch Rooms Service
//!
//! Live room voting over WebSockets for the CineMatch movie-discovery
//! platform.
//!
//! Features:
//! - Per-user connection registry with replace-on-reconnect semantics
//! - Live room membership tracking with emptiness-driven state eviction
//! - Sequential-ballot voting sessions with quorum-driven advancement
//! - Deterministic winner computation and result broadcast
//! - Group-recommendation delivery to connected rooms

pub mod config;
pub mod coordinator;
pub mod directory;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod voting;
pub mod websocket;
pub mod ws;

pub use config::{ConfigError, RoomsConfig};
pub use coordinator::RoomCoordinator;
pub use directory::{InMemoryRoomDirectory, RoomDirectory, RoomProfile};
pub use protocol::{
    Candidate, ClientMessage, RoomParticipant, RoomStatus, ServerMessage, VoteValue, VotingResult,
};
pub use server::{start_server, ServerState};
pub use storage::{NoopResultSink, PostgresResultSink, ResultSink};
pub use voting::{finalize, BallotProgress, VotingError, VotingSession};
pub use websocket::RoomWebSocket;
pub use ws::{ConnectionRegistry, MembershipTracker, OutboundFrame};

/// Initialize tracing for the rooms service
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinematch_rooms=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
