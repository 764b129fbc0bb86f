//! End-to-end voting flows through the room coordinator
//!
//! Collector actors stand in for WebSocket session actors so the tests can
//! observe every frame a client would receive.

use actix::{Actor, ActorContext, Context, Handler, Recipient};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use cinematch_rooms::{
    Candidate, InMemoryRoomDirectory, NoopResultSink, OutboundFrame, RoomCoordinator,
    RoomParticipant, RoomProfile, RoomStatus, VoteValue,
};

struct Collector {
    frames: Arc<Mutex<Vec<String>>>,
}

impl Actor for Collector {
    type Context = Context<Self>;
}

impl Handler<OutboundFrame> for Collector {
    type Result = ();

    fn handle(&mut self, msg: OutboundFrame, _ctx: &mut Context<Self>) {
        self.frames.lock().push(msg.0);
    }
}

#[derive(actix::Message)]
#[rtype(result = "()")]
struct Shutdown;

impl Handler<Shutdown> for Collector {
    type Result = ();

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Context<Self>) {
        ctx.stop();
    }
}

fn collector() -> (
    actix::Addr<Collector>,
    Recipient<OutboundFrame>,
    Arc<Mutex<Vec<String>>>,
) {
    let frames = Arc::new(Mutex::new(Vec::new()));
    let addr = Collector {
        frames: frames.clone(),
    }
    .start();
    let recipient = addr.clone().recipient();
    (addr, recipient, frames)
}

async fn settle() {
    actix_rt::time::sleep(Duration::from_millis(30)).await;
}

fn candidate(id: &str) -> Candidate {
    Candidate {
        movie_id: id.to_string(),
        title: format!("Movie {id}"),
        poster_path: Some(format!("/posters/{id}.jpg")),
        group_score: 0.8,
        reasons: vec!["liked by most of the group".to_string()],
        participants_who_liked: vec![],
    }
}

fn directory(owner: &str, members: &[&str], candidates: &[&str]) -> Arc<InMemoryRoomDirectory> {
    let dir = Arc::new(InMemoryRoomDirectory::new());
    dir.insert_room(RoomProfile {
        room_id: "room-1".to_string(),
        owner_id: owner.to_string(),
        status: RoomStatus::Active,
        max_participants: 10,
        participants: members
            .iter()
            .map(|m| RoomParticipant {
                user_id: m.to_string(),
                display_name: None,
                is_owner: *m == owner,
            })
            .collect(),
    });
    dir.insert_recommendations("room-1", candidates.iter().map(|c| candidate(c)).collect());
    dir
}

fn coordinator(dir: Arc<InMemoryRoomDirectory>) -> Arc<RoomCoordinator> {
    Arc::new(RoomCoordinator::new(dir, Arc::new(NoopResultSink)))
}

fn msgs_of_type(frames: &Arc<Mutex<Vec<String>>>, ty: &str) -> Vec<serde_json::Value> {
    frames
        .lock()
        .iter()
        .filter_map(|f| serde_json::from_str::<serde_json::Value>(f).ok())
        .filter(|v| v["type"] == ty)
        .collect()
}

#[actix_rt::test]
async fn test_two_member_session_full_flow() {
    // Scenario A: both like M1, split on M2, both dislike M3.
    let coord = coordinator(directory("u1", &["u1", "u2"], &["m1", "m2", "m3"]));
    let (_a1, r1, f1) = collector();
    let (_a2, r2, f2) = collector();

    coord.connect("u1", r1);
    coord.connect("u2", r2);
    coord.join_room("u1", "room-1");
    coord.join_room("u2", "room-1");
    coord.start_voting("room-1", "u1").await;
    settle().await;

    let shown = msgs_of_type(&f1, "current_movie");
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0]["movie"]["movie_id"], "m1");
    assert_eq!(shown[0]["movie_index"], 1);
    assert_eq!(shown[0]["total_movies"], 3);

    // First vote alone must not advance.
    coord.handle_vote("room-1", "u1", "m1", VoteValue::Like);
    settle().await;
    assert_eq!(msgs_of_type(&f1, "current_movie").len(), 1);
    assert_eq!(msgs_of_type(&f2, "vote_recorded").len(), 1);
    // The voter gets an ack, not their own echo.
    assert_eq!(msgs_of_type(&f1, "vote_confirmed").len(), 1);
    assert_eq!(msgs_of_type(&f1, "vote_recorded").len(), 0);

    coord.handle_vote("room-1", "u2", "m1", VoteValue::Like);
    coord.handle_vote("room-1", "u1", "m2", VoteValue::Like);
    coord.handle_vote("room-1", "u2", "m2", VoteValue::Dislike);
    coord.handle_vote("room-1", "u1", "m3", VoteValue::Dislike);
    coord.handle_vote("room-1", "u2", "m3", VoteValue::Dislike);
    settle().await;

    // Broadcasts arrived strictly in ballot order.
    let shown = msgs_of_type(&f1, "current_movie");
    let indexes: Vec<i64> = shown
        .iter()
        .map(|m| m["movie_index"].as_i64().unwrap())
        .collect();
    assert_eq!(indexes, vec![1, 2, 3]);

    let results = msgs_of_type(&f2, "voting_result");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["winner"]["movie_id"], "m1");
    assert_eq!(results[0]["score"], 1.0);
    assert_eq!(results[0]["all_scores"]["m2"], 0.5);
    assert_eq!(results[0]["total_participants"], 2);

    // Session state is discarded after the result broadcast.
    assert!(!coord.has_session("room-1"));
}

#[actix_rt::test]
async fn test_single_member_room_finalizes_without_waiting() {
    // Scenario B: quorum of one.
    let coord = coordinator(directory("u1", &["u1"], &["m1", "m2"]));
    let (_a1, r1, f1) = collector();

    coord.connect("u1", r1);
    coord.join_room("u1", "room-1");
    coord.start_voting("room-1", "u1").await;
    coord.handle_vote("room-1", "u1", "m1", VoteValue::Like);
    coord.handle_vote("room-1", "u1", "m2", VoteValue::Dislike);
    settle().await;

    let results = msgs_of_type(&f1, "voting_result");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["winner"]["movie_id"], "m1");
    assert!(!coord.has_session("room-1"));
}

#[actix_rt::test]
async fn test_disconnect_shrinks_quorum() {
    let coord = coordinator(directory("u1", &["u1", "u2"], &["m1", "m2"]));
    let (_a1, r1, f1) = collector();
    let (_a2, r2, _f2) = collector();

    coord.connect("u1", r1);
    coord.connect("u2", r2);
    coord.join_room("u1", "room-1");
    coord.join_room("u2", "room-1");
    coord.start_voting("room-1", "u1").await;

    // A participant leaves mid-ballot; the remaining member alone reaches quorum.
    coord.disconnect("u2");
    coord.handle_vote("room-1", "u1", "m1", VoteValue::Like);
    settle().await;

    let shown = msgs_of_type(&f1, "current_movie");
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[1]["movie"]["movie_id"], "m2");
}

#[actix_rt::test]
async fn test_last_disconnect_discards_session_and_restart_is_fresh() {
    let coord = coordinator(directory("u1", &["u1"], &["m1", "m2"]));
    let (_a1, r1, _f1) = collector();

    coord.connect("u1", r1);
    coord.join_room("u1", "room-1");
    coord.start_voting("room-1", "u1").await;
    coord.handle_vote("room-1", "u1", "m1", VoteValue::Like);
    assert!(coord.has_session("room-1"));

    coord.disconnect("u1");
    assert_eq!(coord.room_count(), 0);
    assert!(!coord.has_session("room-1"));

    // Reconnect and restart: the ballot begins again at the first candidate.
    let (_a2, r2, f2) = collector();
    coord.connect("u1", r2);
    coord.join_room("u1", "room-1");
    coord.start_voting("room-1", "u1").await;
    settle().await;

    let shown = msgs_of_type(&f2, "current_movie");
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0]["movie"]["movie_id"], "m1");
    assert_eq!(shown[0]["movie_index"], 1);
}

#[actix_rt::test]
async fn test_non_member_vote_rejected_without_state_change() {
    let coord = coordinator(directory("u1", &["u1", "u3"], &["m1"]));
    let (_a1, r1, _f1) = collector();
    let (_a3, r3, f3) = collector();

    coord.connect("u1", r1);
    coord.connect("u3", r3);
    coord.join_room("u1", "room-1");
    // u3 is connected but never joined the room.
    coord.start_voting("room-1", "u1").await;
    coord.handle_vote("room-1", "u3", "m1", VoteValue::Like);
    settle().await;

    assert_eq!(msgs_of_type(&f3, "error").len(), 1);
    assert_eq!(msgs_of_type(&f3, "vote_confirmed").len(), 0);
    assert!(coord.has_session("room-1"));
}

#[actix_rt::test]
async fn test_out_of_turn_vote_rejected_session_continues() {
    let coord = coordinator(directory("u1", &["u1"], &["m1", "m2"]));
    let (_a1, r1, f1) = collector();

    coord.connect("u1", r1);
    coord.join_room("u1", "room-1");
    coord.start_voting("room-1", "u1").await;

    coord.handle_vote("room-1", "u1", "m2", VoteValue::Like);
    settle().await;
    assert_eq!(msgs_of_type(&f1, "error").len(), 1);

    // The correct vote still goes through afterwards.
    coord.handle_vote("room-1", "u1", "m1", VoteValue::Like);
    settle().await;
    assert_eq!(msgs_of_type(&f1, "vote_confirmed").len(), 1);
}

#[actix_rt::test]
async fn test_start_from_non_owner_rejected() {
    let coord = coordinator(directory("u1", &["u1", "u2"], &["m1"]));
    let (_a2, r2, f2) = collector();

    coord.connect("u2", r2);
    coord.join_room("u2", "room-1");
    coord.start_voting("room-1", "u2").await;
    settle().await;

    let errors = msgs_of_type(&f2, "error");
    assert_eq!(errors.len(), 1);
    assert!(errors[0]["message"]
        .as_str()
        .unwrap()
        .contains("room owner"));
    assert!(!coord.has_session("room-1"));
}

#[actix_rt::test]
async fn test_start_without_recommendations_rejected() {
    let coord = coordinator(directory("u1", &["u1"], &[]));
    let (_a1, r1, f1) = collector();

    coord.connect("u1", r1);
    coord.join_room("u1", "room-1");
    coord.start_voting("room-1", "u1").await;
    settle().await;

    assert_eq!(msgs_of_type(&f1, "error").len(), 1);
    assert!(!coord.has_session("room-1"));
}

#[actix_rt::test]
async fn test_start_without_connected_members_creates_no_room_state() {
    let coord = coordinator(directory("u1", &["u1"], &["m1"]));
    let (_a1, r1, f1) = collector();

    // Owner is connected but never joined the room.
    coord.connect("u1", r1);
    coord.start_voting("room-1", "u1").await;
    settle().await;

    assert_eq!(msgs_of_type(&f1, "error").len(), 1);
    // No membership entry may materialize: an empty room with a session
    // attached could never be evicted.
    assert_eq!(coord.room_count(), 0);
    assert!(!coord.has_session("room-1"));
}

#[actix_rt::test]
async fn test_double_start_rejected() {
    let coord = coordinator(directory("u1", &["u1"], &["m1", "m2"]));
    let (_a1, r1, f1) = collector();

    coord.connect("u1", r1);
    coord.join_room("u1", "room-1");
    coord.start_voting("room-1", "u1").await;
    coord.start_voting("room-1", "u1").await;
    settle().await;

    assert_eq!(msgs_of_type(&f1, "error").len(), 1);
    // Only one ballot opening was broadcast.
    assert_eq!(msgs_of_type(&f1, "current_movie").len(), 1);
}

#[actix_rt::test]
async fn test_dead_connection_cascades_out_of_membership() {
    let coord = coordinator(directory("u1", &["u1", "u2"], &["m1", "m2"]));
    let (a1, r1, _f1) = collector();
    let (_a2, r2, f2) = collector();

    coord.connect("u1", r1);
    coord.connect("u2", r2);
    coord.join_room("u1", "room-1");
    coord.join_room("u2", "room-1");
    coord.start_voting("room-1", "u1").await;

    // u1's channel dies without a clean disconnect.
    a1.do_send(Shutdown);
    settle().await;

    // u2's vote triggers a broadcast to u1, which fails and evicts u1 from
    // the room; the quorum denominator shrinks retroactively.
    coord.handle_vote("room-1", "u2", "m1", VoteValue::Like);
    settle().await;

    assert!(!coord.is_connected("u1"));
    assert_eq!(coord.connected_count("room-1"), 1);

    // With u1 gone, u2 alone advances the ballot on the next vote.
    coord.handle_vote("room-1", "u2", "m1", VoteValue::Like);
    settle().await;
    let shown = msgs_of_type(&f2, "current_movie");
    assert_eq!(shown.last().unwrap()["movie"]["movie_id"], "m2");
}

#[actix_rt::test]
async fn test_join_and_leave_notifications() {
    let coord = coordinator(directory("u1", &["u1", "u2"], &["m1"]));
    let (_a1, r1, f1) = collector();
    let (_a2, r2, f2) = collector();

    coord.connect("u1", r1);
    coord.join_room("u1", "room-1");
    settle().await;
    assert_eq!(msgs_of_type(&f1, "room_joined").len(), 1);

    coord.connect("u2", r2);
    coord.join_room("u2", "room-1");
    settle().await;

    // Existing member sees the join; the joiner does not see their own.
    let joins = msgs_of_type(&f1, "user_joined");
    assert_eq!(joins.len(), 1);
    assert_eq!(joins[0]["participant_count"], 2);
    assert_eq!(msgs_of_type(&f2, "user_joined").len(), 0);

    coord.leave_room("u2", "room-1");
    settle().await;
    let leaves = msgs_of_type(&f1, "user_left");
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0]["participant_count"], 1);
}

#[actix_rt::test]
async fn test_group_recommendations_broadcast() {
    let coord = coordinator(directory("u1", &["u1", "u2"], &[]));
    let (_a1, r1, f1) = collector();
    let (_a2, r2, f2) = collector();

    coord.connect("u1", r1);
    coord.connect("u2", r2);
    coord.join_room("u1", "room-1");
    coord.join_room("u2", "room-1");

    coord.deliver_recommendations("room-1", vec![candidate("m1"), candidate("m2")]);
    settle().await;

    for frames in [&f1, &f2] {
        let msgs = msgs_of_type(frames, "group_recommendations");
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0]["recommendations"].as_array().unwrap().len(), 2);
        assert_eq!(msgs[0]["participant_count"], 2);
    }
}

#[actix_rt::test]
async fn test_reconnect_replaces_channel_without_evicting_membership() {
    let coord = coordinator(directory("u1", &["u1"], &["m1"]));
    let (_a1, r1, f1) = collector();

    coord.connect("u1", r1);
    coord.join_room("u1", "room-1");

    // Reconnect: the fresh channel takes over, old one goes quiet.
    let (_a2, r2, f2) = collector();
    coord.connect("u1", r2);
    coord.join_room("u1", "room-1");
    settle().await;

    assert_eq!(coord.connection_count(), 1);
    assert_eq!(coord.connected_count("room-1"), 1);

    let before = f1.lock().len();
    coord.start_voting("room-1", "u1").await;
    settle().await;

    assert_eq!(f1.lock().len(), before);
    assert_eq!(msgs_of_type(&f2, "current_movie").len(), 1);
}
