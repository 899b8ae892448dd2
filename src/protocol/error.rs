//! Protocol error types.

use thiserror::Error;

use super::state::Phase;
use crate::core::{CommitmentError, IntegrityError};

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A peer sent something the current phase does not allow.
    #[error("unexpected message in {phase}: expected {expected}, received {received}")]
    UnexpectedMessage {
        /// Phase the receiver was in.
        phase: Phase,
        /// What the phase allows.
        expected: &'static str,
        /// What arrived instead.
        received: String,
    },

    /// An event was applied to a phase it does not belong to.
    #[error("invalid transition from {phase} on {event}")]
    InvalidTransition {
        /// Current phase.
        phase: Phase,
        /// Offending event.
        event: String,
    },

    /// A verdict report is not one of `1`, `0`, `-1`.
    #[error("malformed verdict code: {0:?}")]
    MalformedVerdict(String),

    /// The candidate upload did not contain exactly the expected number of graphs.
    #[error("expected {expected} candidate graphs, received {received}")]
    CandidateCount {
        /// Expected count.
        expected: usize,
        /// Received count.
        received: usize,
    },

    /// Integrity violation between the peers.
    #[error("integrity mismatch: {0}")]
    Integrity(#[from] IntegrityError),

    /// Commitment or codec failure.
    #[error("commitment error: {0}")]
    Commitment(#[from] CommitmentError),

    /// Transport failure, including peer disconnects.
    #[cfg(feature = "transport")]
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),
}

impl ProtocolError {
    /// Check if this error is an integrity violation (bug or cheating).
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, ProtocolError::Integrity(_))
    }

    /// Check if the session ended because a peer went away.
    pub fn is_connection_closed(&self) -> bool {
        #[cfg(feature = "transport")]
        if let ProtocolError::Transport(err) = self {
            return err.is_connection_closed();
        }
        false
    }

    /// Check if the peer broke the message contract of a phase.
    pub fn is_violation(&self) -> bool {
        matches!(
            self,
            ProtocolError::UnexpectedMessage { .. }
                | ProtocolError::InvalidTransition { .. }
                | ProtocolError::MalformedVerdict(_)
                | ProtocolError::CandidateCount { .. }
        )
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
