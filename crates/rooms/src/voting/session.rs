//! Sequential-ballot voting state machine
//!
//! Pure in-memory state: no I/O, no locking, no authorization. The caller
//! (the room coordinator) serializes access per room, verifies that voters
//! are connected members, and delivers the broadcasts this machine implies.

use std::collections::HashMap;

use crate::protocol::{Candidate, VoteValue};

/// Voting protocol errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VotingError {
    #[error("candidate list is empty")]
    EmptyCandidates,

    #[error("a voting session is already active")]
    SessionActive,

    #[error("only the room owner can start voting")]
    NotOwner,

    #[error("no connected members in the room")]
    NoMembers,

    #[error("no active voting session")]
    NoSession,

    #[error("vote is not for the current candidate")]
    NotCurrentCandidate,

    #[error("voter is not a connected room member")]
    NotAMember,
}

/// Outcome of recording one vote on the current candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BallotProgress {
    /// Quorum not yet reached for the current candidate
    Waiting { votes: usize, quorum: usize },
    /// Quorum reached; the ballot moved to the next candidate
    Advanced,
    /// Quorum reached on the last candidate; the session is ready to finalize
    Exhausted,
}

/// Per-room ballot over an ordered candidate list
#[derive(Debug)]
pub struct VotingSession {
    candidates: Vec<Candidate>,
    current_index: usize,
    /// candidate id -> (user id -> vote), one entry per distinct candidate id
    ledger: HashMap<String, HashMap<String, VoteValue>>,
}

impl VotingSession {
    /// Start a session over an ordered, already-ranked candidate list.
    ///
    /// The ledger gets exactly one empty entry per candidate id. Duplicate
    /// ids in the input share a single entry (first occurrence wins).
    pub fn new(candidates: Vec<Candidate>) -> Result<Self, VotingError> {
        if candidates.is_empty() {
            return Err(VotingError::EmptyCandidates);
        }

        let mut ledger: HashMap<String, HashMap<String, VoteValue>> =
            HashMap::with_capacity(candidates.len());
        for candidate in &candidates {
            if ledger.contains_key(&candidate.movie_id) {
                tracing::warn!(
                    "Duplicate candidate id {} in ballot, keeping first occurrence",
                    candidate.movie_id
                );
                continue;
            }
            ledger.insert(candidate.movie_id.clone(), HashMap::new());
        }

        Ok(Self {
            candidates,
            current_index: 0,
            ledger,
        })
    }

    /// Candidate currently up for vote, `None` once the list is exhausted.
    pub fn current_candidate(&self) -> Option<&Candidate> {
        self.candidates.get(self.current_index)
    }

    /// 0-based index of the current candidate. Monotonically non-decreasing.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn total_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn ledger(&self) -> &HashMap<String, HashMap<String, VoteValue>> {
        &self.ledger
    }

    /// Record a vote for the current candidate and run the quorum check.
    ///
    /// `connected` is the number of currently connected room members at this
    /// instant; it is the quorum denominator. A repeat vote by the same user
    /// overwrites the earlier one (last write wins).
    pub fn record_vote(
        &mut self,
        user_id: &str,
        movie_id: &str,
        vote: VoteValue,
        connected: usize,
    ) -> Result<BallotProgress, VotingError> {
        let current = self.current_candidate().ok_or(VotingError::NoSession)?;
        if current.movie_id != movie_id {
            return Err(VotingError::NotCurrentCandidate);
        }
        let current_id = current.movie_id.clone();

        let votes = self.ledger.entry(current_id).or_default();
        votes.insert(user_id.to_string(), vote);
        let recorded = votes.len();

        if recorded >= connected {
            self.current_index += 1;
            if self.current_index >= self.candidates.len() {
                Ok(BallotProgress::Exhausted)
            } else {
                Ok(BallotProgress::Advanced)
            }
        } else {
            Ok(BallotProgress::Waiting {
                votes: recorded,
                quorum: connected,
            })
        }
    }
}
