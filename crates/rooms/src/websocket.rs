//! WebSocket session actor for room connections
//!
//! One actor per open channel. On start it registers the connection, joins
//! the room, and unicasts the room-state snapshot captured at admission. On
//! stop it runs disconnect cleanup, unless a newer connection for the same
//! user has already replaced it.

use actix::{Actor, ActorContext, AsyncContext, Handler, StreamHandler};
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::coordinator::RoomCoordinator;
use crate::directory::RoomProfile;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::ws::registry::{ConnectionId, OutboundFrame};

/// Heartbeat ping interval
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Client timeout (two missed heartbeats)
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct RoomWebSocket {
    user_id: String,
    room_id: String,

    /// Durable profile fetched during admission, used for the join snapshot
    profile: RoomProfile,

    /// Last heartbeat timestamp
    hb: Instant,

    conn_id: Option<ConnectionId>,
    coordinator: Arc<RoomCoordinator>,
}

impl RoomWebSocket {
    pub fn new(
        user_id: String,
        room_id: String,
        profile: RoomProfile,
        coordinator: Arc<RoomCoordinator>,
    ) -> Self {
        Self {
            user_id,
            room_id,
            profile,
            hb: Instant::now(),
            conn_id: None,
            coordinator,
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(
                    "WebSocket client {} heartbeat timeout, disconnecting",
                    act.user_id
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientMessage::Vote { movie_id, vote } => {
                self.coordinator
                    .handle_vote(&self.room_id, &self.user_id, &movie_id, vote);
            }
            ClientMessage::StartVoting => {
                let coordinator = self.coordinator.clone();
                let room_id = self.room_id.clone();
                let user_id = self.user_id.clone();
                actix::spawn(async move {
                    coordinator.start_voting(&room_id, &user_id).await;
                });
            }
            ClientMessage::GetRoomStatus => {
                let coordinator = self.coordinator.clone();
                let room_id = self.room_id.clone();
                let user_id = self.user_id.clone();
                actix::spawn(async move {
                    coordinator.report_room_status(&room_id, &user_id).await;
                });
            }
            ClientMessage::Ping { timestamp } => {
                self.send_message(&ServerMessage::Pong { timestamp }, ctx);
            }
        }
    }

    /// Write a message straight onto this session's socket.
    fn send_message(&self, message: &ServerMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match message.to_json() {
            Ok(json) => ctx.text(json),
            Err(err) => {
                tracing::error!("Failed to serialize message for {}: {}", self.user_id, err);
            }
        }
    }
}

impl Actor for RoomWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "WebSocket connection established for user {} in room {}",
            self.user_id,
            self.room_id
        );
        self.start_heartbeat(ctx);

        let conn_id = self
            .coordinator
            .connect(&self.user_id, ctx.address().recipient());
        self.conn_id = Some(conn_id);

        self.coordinator.join_room(&self.user_id, &self.room_id);

        self.send_message(
            &ServerMessage::RoomState {
                room_id: self.room_id.clone(),
                status: self.profile.status,
                participants: self.profile.participants.clone(),
            },
            ctx,
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(conn_id) = self.conn_id {
            self.coordinator.connection_closed(&self.user_id, conn_id);
        }
        tracing::info!(
            "WebSocket connection closed for user {} in room {}",
            self.user_id,
            self.room_id
        );
    }
}

/// Frames pushed by the coordinator through the registry
impl Handler<OutboundFrame> for RoomWebSocket {
    type Result = ();

    fn handle(&mut self, msg: OutboundFrame, ctx: &mut Self::Context) -> Self::Result {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RoomWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => self.handle_client_message(msg, ctx),
                Err(err) => {
                    tracing::warn!(
                        "Malformed message from user {}: {}",
                        self.user_id,
                        err
                    );
                    self.send_message(&ServerMessage::error("Invalid message format"), ctx);
                }
            },
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("WebSocket close received: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                tracing::warn!("WebSocket continuation frames not supported");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                tracing::error!("WebSocket protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}
