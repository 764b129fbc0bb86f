//! Actix-web HTTP server for the rooms service
//!
//! Endpoints:
//! - GET  /health - Health check
//! - GET  /ws/{room_id} - WebSocket upgrade for a room connection
//! - POST /api/v1/rooms/{room_id}/recommendations - Push a candidate list to
//!   a room (called by the recommendation pipeline)

use actix_web::{get, post, web, App, HttpRequest, HttpResponse, HttpServer, Responder, Result};
use actix_web_actors::ws;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::RoomsConfig;
use crate::coordinator::RoomCoordinator;
use crate::directory::RoomDirectory;
use crate::protocol::Candidate;
use crate::storage::ResultSink;
use crate::websocket::RoomWebSocket;

/// Server state shared across handlers
pub struct ServerState {
    pub coordinator: Arc<RoomCoordinator>,
    pub directory: Arc<dyn RoomDirectory>,
}

#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "cinematch-rooms",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    /// Identity asserted by the API gateway after token verification.
    user_id: String,
}

/// WebSocket upgrade for a room connection.
///
/// Admission control mirrors the platform contract: the gateway has already
/// authenticated the token; this handler verifies the room exists and the
/// user is a participant of record before upgrading.
#[get("/ws/{room_id}")]
async fn room_websocket(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    query: web::Query<WsQuery>,
    state: web::Data<ServerState>,
) -> Result<HttpResponse> {
    let room_id = path.into_inner();
    let user_id = query.into_inner().user_id;

    let profile = match state.directory.room(&room_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "error": "Room not found"
            })));
        }
        Err(err) => {
            tracing::error!("Failed to load room {}: {}", room_id, err);
            return Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to load room"
            })));
        }
    };

    if !profile.is_participant(&user_id) {
        return Ok(HttpResponse::Forbidden().json(serde_json::json!({
            "error": "Not a room participant"
        })));
    }

    let session = RoomWebSocket::new(user_id, room_id, profile, state.coordinator.clone());
    ws::start(session, &req, stream)
}

/// Recommendation pipeline hand-off: broadcast a fresh candidate list to the
/// room's connected members.
#[post("/api/v1/rooms/{room_id}/recommendations")]
async fn deliver_recommendations(
    path: web::Path<String>,
    body: web::Json<Vec<Candidate>>,
    state: web::Data<ServerState>,
) -> impl Responder {
    let room_id = path.into_inner();
    let recommendations = body.into_inner();
    let count = recommendations.len();

    state
        .coordinator
        .deliver_recommendations(&room_id, recommendations);

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "room_id": room_id,
        "delivered": count
    }))
}

/// Start the rooms server
pub async fn start_server(
    config: RoomsConfig,
    directory: Arc<dyn RoomDirectory>,
    results: Arc<dyn ResultSink>,
) -> std::io::Result<()> {
    tracing::info!(
        "Starting CineMatch Rooms Service on {}:{}",
        config.host,
        config.port
    );

    let coordinator = Arc::new(RoomCoordinator::new(directory.clone(), results));
    let state = web::Data::new(ServerState {
        coordinator,
        directory,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(health_check)
            .service(room_websocket)
            .service(deliver_recommendations)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
