//! Vertex permutations used to hide a candidate graph.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::graph::{Edge, Graph, Vertex};
use crate::core::CommitmentError;

/// A bijection on `0..len`: vertex `v` is relabeled to `self[v]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Permutation(Vec<Vertex>);

impl Permutation {
    /// Identity on `0..len`.
    pub fn identity(len: u32) -> Self {
        Self((0..len).collect())
    }

    /// Uniformly random permutation on `0..len`.
    pub fn random<R: Rng + ?Sized>(len: u32, rng: &mut R) -> Self {
        let mut labels: Vec<Vertex> = (0..len).collect();
        labels.shuffle(rng);
        Self(labels)
    }

    /// Validate that `labels` is a bijection on `0..labels.len()`.
    pub fn from_vec(labels: Vec<Vertex>) -> Result<Self, CommitmentError> {
        let mut seen = vec![false; labels.len()];
        for &label in &labels {
            let slot = seen.get_mut(label as usize).ok_or_else(|| {
                CommitmentError::InvalidPermutation(format!(
                    "label {label} outside 0..{}",
                    labels.len()
                ))
            })?;
            if *slot {
                return Err(CommitmentError::InvalidPermutation(format!(
                    "label {label} appears twice"
                )));
            }
            *slot = true;
        }
        Ok(Self(labels))
    }

    /// Domain size.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the domain is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Image of `v`, if `v` is in the domain.
    pub fn map(&self, v: Vertex) -> Option<Vertex> {
        self.0.get(v as usize).copied()
    }

    /// Raw label table.
    pub fn as_slice(&self) -> &[Vertex] {
        &self.0
    }

    /// The inverse bijection.
    pub fn inverse(&self) -> Self {
        let mut inverse = vec![0; self.0.len()];
        for (from, &to) in self.0.iter().enumerate() {
            inverse[to as usize] = from as Vertex;
        }
        Self(inverse)
    }

    /// Relabel every endpoint of every edge of `graph`.
    ///
    /// Fails if an endpoint lies outside the domain, so a permutation can only
    /// be applied to graphs over its own vertex set.
    pub fn apply(&self, graph: &Graph) -> Result<Graph, CommitmentError> {
        let mut relabeled = Graph::new();
        for edge in graph.edges() {
            let a = self.checked_map(edge.low())?;
            let b = self.checked_map(edge.high())?;
            relabeled.insert(Edge::new(a, b)?);
        }
        Ok(relabeled)
    }

    fn checked_map(&self, v: Vertex) -> Result<Vertex, CommitmentError> {
        self.map(v).ok_or(CommitmentError::VertexOutOfRange {
            vertex: v,
            domain: self.0.len(),
        })
    }
}

impl<'de> Deserialize<'de> for Permutation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let labels = Vec::<Vertex>::deserialize(deserializer)?;
        Permutation::from_vec(labels).map_err(serde::de::Error::custom)
    }
}
