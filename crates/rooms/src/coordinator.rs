//! Per-room orchestration of connections, membership, and voting
//!
//! All mutating operations for one room run under that room's lock; message
//! emission is a non-blocking mailbox hand-off, so broadcasts stay inside the
//! critical section and clients observe candidate broadcasts in index order.
//! Delivery failures are collected during a broadcast and cascade to
//! disconnect cleanup after the lock is released, so a dead connection can
//! never linger as a phantom participant blocking quorum.

use std::sync::Arc;

use actix::Recipient;

use crate::directory::RoomDirectory;
use crate::protocol::{Candidate, ServerMessage, VoteValue, VotingResult};
use crate::storage::ResultSink;
use crate::voting::{finalize, BallotProgress, VotingError, VotingSession};
use crate::ws::membership::{MembershipTracker, RoomState};
use crate::ws::registry::{ConnectionId, ConnectionRegistry, OutboundFrame, SendError};

pub struct RoomCoordinator {
    registry: ConnectionRegistry,
    membership: MembershipTracker,
    directory: Arc<dyn RoomDirectory>,
    results: Arc<dyn ResultSink>,
}

impl RoomCoordinator {
    pub fn new(directory: Arc<dyn RoomDirectory>, results: Arc<dyn ResultSink>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            membership: MembershipTracker::new(),
            directory,
            results,
        }
    }

    /// Register a user's live channel, replacing any prior one.
    pub fn connect(&self, user_id: &str, recipient: Recipient<OutboundFrame>) -> ConnectionId {
        self.registry.connect(user_id, recipient)
    }

    /// Full disconnect cleanup: drop the channel mapping and remove the user
    /// from every room they are connected to, notifying each room.
    pub fn disconnect(&self, user_id: &str) {
        if self.registry.disconnect(user_id) {
            tracing::info!("User {} disconnected", user_id);
            self.remove_from_all_rooms(user_id);
        }
    }

    /// Disconnect cleanup driven by a session actor shutting down.
    ///
    /// Only tears down state if the registry still maps the user to that
    /// actor's connection; a replaced connection leaves the new one alone.
    pub fn connection_closed(&self, user_id: &str, conn_id: ConnectionId) {
        if self.registry.disconnect_if_current(user_id, conn_id) {
            tracing::info!("User {} disconnected", user_id);
            self.remove_from_all_rooms(user_id);
        }
    }

    fn remove_from_all_rooms(&self, user_id: &str) {
        for room_id in self.membership.rooms_of(user_id) {
            self.leave_room(user_id, &room_id);
        }
    }

    /// Add the user to a room's connected set (idempotent), confirm to the
    /// joiner, and broadcast the updated participant count to everyone else.
    ///
    /// The insert and the notifications run while the membership entry is
    /// held, so a racing last-member leave cannot evict the slot out from
    /// under the joiner.
    pub fn join_room(&self, user_id: &str, room_id: &str) {
        let failed = self.membership.join(room_id, user_id, |state| {
            let mut failed = Vec::new();
            let participant_count = state.connected.len();

            match self.registry.send_to(
                user_id,
                &ServerMessage::RoomJoined {
                    room_id: room_id.to_string(),
                    message: "Successfully joined room".to_string(),
                },
            ) {
                Ok(()) | Err(SendError::NotConnected) => {}
                Err(err) => {
                    tracing::error!("Failed to send join confirmation to {}: {}", user_id, err);
                    failed.push(user_id.to_string());
                }
            }

            failed.extend(self.broadcast_locked(
                state,
                &ServerMessage::UserJoined {
                    user_id: user_id.to_string(),
                    room_id: room_id.to_string(),
                    participant_count,
                },
                Some(user_id),
            ));
            failed
        });

        tracing::info!("User {} joined room {}", user_id, room_id);
        self.cascade_failures(failed);
    }

    /// Remove the user from a room's connected set and broadcast the updated
    /// count. An emptied room is evicted together with all its voting state.
    pub fn leave_room(&self, user_id: &str, room_id: &str) {
        let Some(slot) = self.membership.get(room_id) else {
            return;
        };

        let mut failed = Vec::new();
        let emptied;
        {
            let mut state = slot.lock();
            if !state.connected.remove(user_id) {
                return;
            }
            let participant_count = state.connected.len();
            emptied = participant_count == 0;

            if emptied {
                state.session = None;
            } else {
                failed = self.broadcast_locked(
                    &state,
                    &ServerMessage::UserLeft {
                        user_id: user_id.to_string(),
                        room_id: room_id.to_string(),
                        participant_count,
                    },
                    None,
                );
            }
        }

        if emptied {
            self.membership.evict_if_empty(room_id);
            tracing::info!("Room {} emptied, discarded live state", room_id);
        }

        tracing::info!("User {} left room {}", user_id, room_id);
        self.cascade_failures(failed);
    }

    /// Boundary flow for a client's `start_voting` command: verify ownership
    /// against the durable profile, fetch the ranked candidate list, and
    /// start the session.
    pub async fn start_voting(&self, room_id: &str, user_id: &str) {
        let profile = match self.directory.room(room_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                self.unicast(user_id, &ServerMessage::error("Room not found"));
                return;
            }
            Err(err) => {
                tracing::error!("Failed to load room {}: {}", room_id, err);
                self.unicast(user_id, &ServerMessage::error("Failed to load room"));
                return;
            }
        };

        // Ownership is resolved here at the boundary; the state machine
        // itself performs no authorization.
        let is_owner = profile.is_owner(user_id);
        if !is_owner {
            self.unicast(
                user_id,
                &ServerMessage::error(VotingError::NotOwner.to_string()),
            );
            return;
        }

        let candidates = match self.directory.room_recommendations(room_id).await {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::error!("Failed to load recommendations for {}: {}", room_id, err);
                self.unicast(
                    user_id,
                    &ServerMessage::error("Failed to load recommendations"),
                );
                return;
            }
        };

        if candidates.is_empty() {
            self.unicast(
                user_id,
                &ServerMessage::error(
                    "No recommendations available. Generate recommendations first.",
                ),
            );
            return;
        }

        if let Err(err) = self.begin_session(room_id, candidates, is_owner) {
            self.unicast(user_id, &ServerMessage::error(err.to_string()));
        }
    }

    /// Start a voting session over an ordered candidate list.
    ///
    /// `started_by_owner` is the already-verified ownership capability; no
    /// identity is re-resolved here. Valid only when the room has connected
    /// members and no active session, and rejected before any state is
    /// created when the candidate list is empty. On success the first
    /// candidate is broadcast to every connected member.
    pub fn begin_session(
        &self,
        room_id: &str,
        candidates: Vec<Candidate>,
        started_by_owner: bool,
    ) -> Result<(), VotingError> {
        if !started_by_owner {
            return Err(VotingError::NotOwner);
        }

        let total = candidates.len();
        let session = VotingSession::new(candidates)?;

        // A room only materializes through joins; creating a slot here would
        // leak an entry that no leave can ever evict.
        let Some(slot) = self.membership.get(room_id) else {
            return Err(VotingError::NoMembers);
        };
        let failed;
        {
            let mut state = slot.lock();
            if state.connected.is_empty() {
                return Err(VotingError::NoMembers);
            }
            if state.session.is_some() {
                return Err(VotingError::SessionActive);
            }
            state.session = Some(session);
            failed = self.emit_current_locked(room_id, &state);
        }

        tracing::info!(
            "Started voting session for room {} with {} candidates",
            room_id,
            total
        );
        self.cascade_failures(failed);
        Ok(())
    }

    /// Record a member's vote on the current candidate.
    ///
    /// Protocol violations (non-member, no session, wrong candidate) are
    /// answered with an error unicast and leave all state untouched. A
    /// recorded vote is acked to the voter, echoed to everyone else, and may
    /// advance or finalize the ballot when quorum is reached.
    pub fn handle_vote(&self, room_id: &str, user_id: &str, movie_id: &str, vote: VoteValue) {
        let Some(slot) = self.membership.get(room_id) else {
            self.unicast(
                user_id,
                &ServerMessage::error(VotingError::NoSession.to_string()),
            );
            return;
        };

        let mut failed = Vec::new();
        let mut finalized: Option<VotingResult> = None;
        {
            let mut state = slot.lock();
            if !state.connected.contains(user_id) {
                drop(state);
                self.unicast(
                    user_id,
                    &ServerMessage::error(VotingError::NotAMember.to_string()),
                );
                return;
            }
            let connected = state.connected.len();

            let progress = match state.session.as_mut() {
                Some(session) => session.record_vote(user_id, movie_id, vote, connected),
                None => Err(VotingError::NoSession),
            };
            let progress = match progress {
                Ok(progress) => progress,
                Err(err) => {
                    drop(state);
                    self.unicast(user_id, &ServerMessage::error(err.to_string()));
                    return;
                }
            };

            match self.registry.send_to(
                user_id,
                &ServerMessage::VoteConfirmed {
                    movie_id: movie_id.to_string(),
                    vote,
                },
            ) {
                Ok(()) | Err(SendError::NotConnected) => {}
                Err(err) => {
                    tracing::error!("Failed to send vote confirmation to {}: {}", user_id, err);
                    failed.push(user_id.to_string());
                }
            }

            failed.extend(self.broadcast_locked(
                &state,
                &ServerMessage::VoteRecorded {
                    room_id: room_id.to_string(),
                    user_id: user_id.to_string(),
                    movie_id: movie_id.to_string(),
                    vote,
                },
                Some(user_id),
            ));

            match progress {
                BallotProgress::Waiting { votes, quorum } => {
                    tracing::debug!(
                        "Vote recorded in room {}: {}/{} on current candidate",
                        room_id,
                        votes,
                        quorum
                    );
                }
                BallotProgress::Advanced => {
                    failed.extend(self.emit_current_locked(room_id, &state));
                }
                BallotProgress::Exhausted => {
                    if let Some(session) = state.session.take() {
                        if let Some(result) = finalize(room_id, &session, connected) {
                            failed.extend(self.broadcast_locked(
                                &state,
                                &ServerMessage::from(&result),
                                None,
                            ));
                            finalized = Some(result);
                        }
                    }
                }
            }
        }

        self.cascade_failures(failed);

        if let Some(result) = finalized {
            // Fire-and-forget hand-off to the persistence collaborator.
            let sink = self.results.clone();
            actix::spawn(async move {
                if let Err(err) = sink.store_result(&result).await {
                    tracing::error!(
                        "Failed to hand off voting result for room {}: {}",
                        result.room_id,
                        err
                    );
                }
            });
        }
    }

    /// Push a freshly generated candidate list to a room's connected members.
    pub fn deliver_recommendations(&self, room_id: &str, recommendations: Vec<Candidate>) {
        let Some(slot) = self.membership.get(room_id) else {
            tracing::debug!("No connected members in room {}, skipping delivery", room_id);
            return;
        };

        let failed;
        {
            let state = slot.lock();
            let message = ServerMessage::GroupRecommendations {
                room_id: room_id.to_string(),
                participant_count: state.connected.len(),
                recommendations,
            };
            failed = self.broadcast_locked(&state, &message, None);
        }
        self.cascade_failures(failed);
    }

    /// Answer a client's `get_room_status` request.
    pub async fn report_room_status(&self, room_id: &str, user_id: &str) {
        match self.directory.room(room_id).await {
            Ok(Some(profile)) => {
                let current_participants = self.membership.connected_count(room_id);
                self.unicast(
                    user_id,
                    &ServerMessage::RoomStatusReport {
                        room_id: room_id.to_string(),
                        status: profile.status,
                        participants: profile.participants,
                        current_participants,
                        max_participants: profile.max_participants,
                    },
                );
            }
            Ok(None) => self.unicast(user_id, &ServerMessage::error("Room not found")),
            Err(err) => {
                tracing::error!("Failed to load room {}: {}", room_id, err);
                self.unicast(user_id, &ServerMessage::error("Failed to load room"));
            }
        }
    }

    /// Deliver a message to one user. A dead channel cascades to disconnect
    /// cleanup; an absent one is dropped silently.
    pub fn unicast(&self, user_id: &str, message: &ServerMessage) {
        match self.registry.send_to(user_id, message) {
            Ok(()) => {}
            Err(SendError::NotConnected) => {
                tracing::debug!("Dropping message for user {} with no live connection", user_id);
            }
            Err(SendError::Serialization(err)) => {
                tracing::error!("Failed to serialize message for user {}: {}", user_id, err);
            }
            Err(err @ SendError::Closed(_)) => {
                tracing::error!("Failed to send message to user {}: {}", user_id, err);
                self.disconnect(user_id);
            }
        }
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.registry.is_connected(user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    pub fn connected_count(&self, room_id: &str) -> usize {
        self.membership.connected_count(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.membership.room_count()
    }

    /// Whether a room currently has an active voting session.
    pub fn has_session(&self, room_id: &str) -> bool {
        self.membership
            .get(room_id)
            .map(|slot| slot.lock().session.is_some())
            .unwrap_or(false)
    }

    /// Send to every connected member except `exclude`, collecting users
    /// whose channel failed. Callers run disconnect cleanup on those after
    /// releasing the room lock.
    fn broadcast_locked(
        &self,
        state: &RoomState,
        message: &ServerMessage,
        exclude: Option<&str>,
    ) -> Vec<String> {
        let mut failed = Vec::new();
        for member in &state.connected {
            if exclude == Some(member.as_str()) {
                continue;
            }
            match self.registry.send_to(member, message) {
                Ok(()) | Err(SendError::NotConnected) => {}
                Err(err) => {
                    tracing::error!("Failed to send message to user {}: {}", member, err);
                    failed.push(member.clone());
                }
            }
        }
        failed
    }

    /// Broadcast the candidate currently up for vote, with its 1-based
    /// position and the ballot size.
    fn emit_current_locked(&self, room_id: &str, state: &RoomState) -> Vec<String> {
        let Some(session) = state.session.as_ref() else {
            return Vec::new();
        };
        let Some(movie) = session.current_candidate() else {
            return Vec::new();
        };

        let message = ServerMessage::CurrentMovie {
            room_id: room_id.to_string(),
            movie: movie.clone(),
            movie_index: session.current_index() + 1,
            total_movies: session.total_candidates(),
        };
        self.broadcast_locked(state, &message, None)
    }

    fn cascade_failures(&self, failed: Vec<String>) {
        for user_id in failed {
            self.disconnect(&user_id);
        }
    }
}
