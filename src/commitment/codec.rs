//! Byte encoding of graphs and permutations.
//!
//! The protocol treats these payloads as opaque; the core only talks to the
//! [`GraphCodec`] trait. [`JsonCodec`] is the default: an edge list as an
//! array of two-element arrays, a permutation as an array of labels.

use super::graph::Graph;
use super::permutation::Permutation;
use crate::core::CommitmentError;

/// Encoder/decoder for the opaque graph and permutation payloads.
pub trait GraphCodec: Send + Sync {
    /// Serialize a graph's edge list.
    fn encode_graph(&self, graph: &Graph) -> Result<Vec<u8>, CommitmentError>;

    /// Deserialize a graph, rejecting self-loops.
    fn decode_graph(&self, bytes: &[u8]) -> Result<Graph, CommitmentError>;

    /// Serialize a permutation.
    fn encode_permutation(&self, permutation: &Permutation) -> Result<Vec<u8>, CommitmentError>;

    /// Deserialize a permutation, rejecting non-bijections.
    fn decode_permutation(&self, bytes: &[u8]) -> Result<Permutation, CommitmentError>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl GraphCodec for JsonCodec {
    fn encode_graph(&self, graph: &Graph) -> Result<Vec<u8>, CommitmentError> {
        serde_json::to_vec(graph).map_err(|e| CommitmentError::Codec(e.to_string()))
    }

    fn decode_graph(&self, bytes: &[u8]) -> Result<Graph, CommitmentError> {
        serde_json::from_slice(bytes).map_err(|e| CommitmentError::Codec(e.to_string()))
    }

    fn encode_permutation(&self, permutation: &Permutation) -> Result<Vec<u8>, CommitmentError> {
        serde_json::to_vec(permutation).map_err(|e| CommitmentError::Codec(e.to_string()))
    }

    fn decode_permutation(&self, bytes: &[u8]) -> Result<Permutation, CommitmentError> {
        serde_json::from_slice(bytes).map_err(|e| CommitmentError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_wire_shape() {
        let graph = Graph::from_pairs([(1, 0), (2, 1)]).unwrap();
        let bytes = JsonCodec.encode_graph(&graph).unwrap();
        assert_eq!(bytes, b"[[0,1],[1,2]]");
        assert_eq!(JsonCodec.decode_graph(&bytes).unwrap(), graph);
    }

    #[test]
    fn test_permutation_wire_shape() {
        let permutation = Permutation::from_vec(vec![2, 0, 1]).unwrap();
        let bytes = JsonCodec.encode_permutation(&permutation).unwrap();
        assert_eq!(bytes, b"[2,0,1]");
        assert_eq!(JsonCodec.decode_permutation(&bytes).unwrap(), permutation);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            JsonCodec.decode_graph(b"NEED-TURN"),
            Err(CommitmentError::Codec(_))
        ));
        assert!(matches!(
            JsonCodec.decode_graph(b"[[3,3]]"),
            Err(CommitmentError::Codec(_))
        ));
        assert!(matches!(
            JsonCodec.decode_permutation(b"[0,0]"),
            Err(CommitmentError::Codec(_))
        ));
    }
}
