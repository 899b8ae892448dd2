//! Error types shared across the rps-graph layers.

use thiserror::Error;

use crate::commitment::Verdict;

/// Errors raised by the graph commitment scheme.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    /// Regular-graph construction gave up after the retry budget.
    #[error(
        "cannot construct a {degree}-regular graph on {vertices} vertices after {attempts} attempts"
    )]
    ConstructionFailure {
        /// Requested vertex count.
        vertices: u32,
        /// Requested uniform degree.
        degree: u32,
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// A permutation is not a bijection over `0..len`.
    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),

    /// An edge connects a vertex with itself.
    #[error("self-loop on vertex {0}")]
    SelfLoop(u32),

    /// A vertex label lies outside the permutation's domain.
    #[error("vertex {vertex} outside permutation domain of size {domain}")]
    VertexOutOfRange {
        /// Offending label.
        vertex: u32,
        /// Size of the permutation.
        domain: usize,
    },

    /// A graph uses a label outside `0..limit`.
    #[error("vertex {vertex} outside label range 0..{limit}")]
    LabelOutOfRange {
        /// Offending label.
        vertex: u32,
        /// Exclusive upper bound.
        limit: u32,
    },

    /// The opaque graph codec rejected a payload.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Integrity violations between the two untrusted peers.
///
/// Always fatal for the session: they indicate either a bug or cheating.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// The two verdict reports are not consistent with each other.
    #[error("verdicts disagree: peer-1 reported {peer1}, peer-2 reported {peer2}")]
    VerdictDisagreement {
        /// Verdict reported by peer-1.
        peer1: Verdict,
        /// Verdict reported by peer-2.
        peer2: Verdict,
    },

    /// An opened commitment matches none of the stored candidates.
    #[error("revealed commitment matches no stored candidate")]
    UnmatchedCommitment,

    /// The opponent's plain choice matches none of the stored candidates.
    #[error("opponent's choice matches no stored candidate")]
    UnknownCandidate,
}

/// Top-level rps-graph errors.
#[derive(Debug, Error)]
pub enum RpsError {
    /// Commitment scheme error.
    #[error("commitment error: {0}")]
    Commitment(#[from] CommitmentError),

    /// Integrity violation.
    #[error("integrity mismatch: {0}")]
    Integrity(#[from] IntegrityError),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] crate::protocol::ProtocolError),

    /// Transport error.
    #[cfg(feature = "transport")]
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// Relay error.
    #[cfg(feature = "server")]
    #[error("relay error: {0}")]
    Relay(#[from] crate::server::RelayError),

    /// Client error.
    #[cfg(feature = "client")]
    #[error("client error: {0}")]
    Client(#[from] crate::client::ClientError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_failure_message() {
        let err = CommitmentError::ConstructionFailure {
            vertices: 5,
            degree: 3,
            attempts: 0,
        };
        assert_eq!(
            err.to_string(),
            "cannot construct a 3-regular graph on 5 vertices after 0 attempts"
        );
    }

    #[test]
    fn test_integrity_wraps_into_top_level() {
        let err: RpsError = IntegrityError::UnmatchedCommitment.into();
        assert!(matches!(err, RpsError::Integrity(_)));
    }
}
