//! Winner computation for completed voting sessions

use std::collections::HashMap;

use crate::protocol::{VoteValue, VotingResult};

use super::session::VotingSession;

/// Compute per-candidate like-ratios and pick the winning candidate.
///
/// A candidate with zero recorded votes scores exactly 0.0, so an un-voted
/// candidate can never win. Ties at the top score break toward the earliest
/// candidate in the original list order. Returns `None` only if the session
/// somehow holds no candidates, which `VotingSession::new` rules out.
pub fn finalize(
    room_id: &str,
    session: &VotingSession,
    total_participants: usize,
) -> Option<VotingResult> {
    let mut all_scores: HashMap<String, f64> = HashMap::with_capacity(session.ledger().len());
    for (movie_id, votes) in session.ledger() {
        let score = if votes.is_empty() {
            0.0
        } else {
            let likes = votes.values().filter(|v| **v == VoteValue::Like).count();
            likes as f64 / votes.len() as f64
        };
        all_scores.insert(movie_id.clone(), score);
    }

    let mut top: Option<(usize, f64)> = None;
    for (idx, candidate) in session.candidates().iter().enumerate() {
        let score = all_scores.get(&candidate.movie_id).copied().unwrap_or(0.0);
        // Strict comparison keeps the earliest candidate on ties.
        if top.map_or(true, |(_, best)| score > best) {
            top = Some((idx, score));
        }
    }

    let (winner_idx, score) = top?;
    let winner = session.candidates()[winner_idx].clone();

    tracing::info!(
        "Voting completed for room {}. Winner: {} (score {:.2})",
        room_id,
        winner.title,
        score
    );

    Some(VotingResult {
        room_id: room_id.to_string(),
        winner,
        score,
        all_scores,
        total_participants,
    })
}
