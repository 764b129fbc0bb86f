//! WebSocket plumbing: connection registry and live room membership

pub mod membership;
pub mod registry;

pub use membership::{MembershipTracker, RoomState};
pub use registry::{ConnectionId, ConnectionRegistry, OutboundFrame, SendError};
