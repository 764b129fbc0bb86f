//! Group voting: sequential ballot state machine and result finalization

pub mod finalizer;
pub mod session;

pub use finalizer::finalize;
pub use session::{BallotProgress, VotingError, VotingSession};
