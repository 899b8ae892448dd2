//! Simple undirected graphs identified by their edge set.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::CommitmentError;

/// Vertex label.
pub type Vertex = u32;

/// Undirected edge, stored with the smaller endpoint first.
///
/// Only built through [`Edge::new`], so both endpoints are below
/// `Vertex::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge(Vertex, Vertex);

impl Edge {
    /// Create a normalized edge. Self-loops and the label `Vertex::MAX` are
    /// rejected.
    pub fn new(a: Vertex, b: Vertex) -> Result<Self, CommitmentError> {
        if a == b {
            return Err(CommitmentError::SelfLoop(a));
        }
        if a.max(b) == Vertex::MAX {
            return Err(CommitmentError::LabelOutOfRange {
                vertex: Vertex::MAX,
                limit: Vertex::MAX,
            });
        }
        Ok(Self(a.min(b), a.max(b)))
    }

    /// Smaller endpoint.
    pub fn low(self) -> Vertex {
        self.0
    }

    /// Larger endpoint.
    pub fn high(self) -> Vertex {
        self.1
    }

    /// Check whether `v` is an endpoint.
    pub fn touches(self, v: Vertex) -> bool {
        self.0 == v || self.1 == v
    }
}

/// A simple undirected graph over an implicit vertex set.
///
/// Equality is equality of edge sets, independent of the order edges were
/// inserted in or which endpoint was listed first.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Graph {
    edges: BTreeSet<Edge>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from endpoint pairs, skipping duplicate unordered pairs.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, CommitmentError>
    where
        I: IntoIterator<Item = (Vertex, Vertex)>,
    {
        let mut graph = Self::new();
        for (a, b) in pairs {
            graph.insert(Edge::new(a, b)?);
        }
        Ok(graph)
    }

    /// Insert an edge. Returns `false` if it was already present.
    pub fn insert(&mut self, edge: Edge) -> bool {
        self.edges.insert(edge)
    }

    /// Iterate edges in ascending order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().copied()
    }

    /// Edges as endpoint pairs, in ascending order.
    pub fn to_pairs(&self) -> Vec<(Vertex, Vertex)> {
        self.edges.iter().map(|e| (e.low(), e.high())).collect()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Size of the label range `0..n` covering every endpoint.
    pub fn vertex_count(&self) -> u32 {
        self.edges.iter().map(|e| e.high() + 1).max().unwrap_or(0)
    }

    /// Check that every label lies in `0..limit`.
    ///
    /// Graphs from the network must pass this before [`Graph::degrees`] or an
    /// isomorphism test sizes buffers by their largest label.
    pub fn check_labels(&self, limit: Vertex) -> Result<(), CommitmentError> {
        match self.edges.iter().map(|e| e.high()).max() {
            Some(vertex) if vertex >= limit => {
                Err(CommitmentError::LabelOutOfRange { vertex, limit })
            }
            _ => Ok(()),
        }
    }

    /// Degree of `v`; zero for labels that appear in no edge.
    pub fn degree(&self, v: Vertex) -> usize {
        self.edges.iter().filter(|e| e.touches(v)).count()
    }

    /// Degree of every label in `0..vertex_count()`.
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0usize; self.vertex_count() as usize];
        for edge in &self.edges {
            degrees[edge.low() as usize] += 1;
            degrees[edge.high() as usize] += 1;
        }
        degrees
    }

    /// Check that every vertex has degree exactly `degree`.
    pub fn is_regular(&self, degree: usize) -> bool {
        self.degrees().iter().all(|&d| d == degree)
    }

    /// Check whether `other` is a relabeling of this graph.
    ///
    /// Backtracking search that assigns vertices in label order and prunes on
    /// degree and on adjacency to already-assigned vertices. Fine for the
    /// small candidate graphs used here; exponential in the worst case.
    pub fn is_isomorphic_to(&self, other: &Graph) -> bool {
        if self.edge_count() != other.edge_count() || self.vertex_count() != other.vertex_count() {
            return false;
        }

        let n = self.vertex_count() as usize;
        let a = self.adjacency(n);
        let b = other.adjacency(n);
        let deg_a = self.degrees();
        let deg_b = other.degrees();

        let mut sorted_a = deg_a.clone();
        let mut sorted_b = deg_b.clone();
        sorted_a.sort_unstable();
        sorted_b.sort_unstable();
        if sorted_a != sorted_b {
            return false;
        }

        let mut search = IsoSearch {
            a: &a,
            b: &b,
            deg_a: &deg_a,
            deg_b: &deg_b,
            mapping: vec![0; n],
            used: vec![false; n],
        };
        search.extend(0)
    }

    fn adjacency(&self, n: usize) -> Vec<Vec<bool>> {
        let mut matrix = vec![vec![false; n]; n];
        for edge in &self.edges {
            let (l, h) = (edge.low() as usize, edge.high() as usize);
            matrix[l][h] = true;
            matrix[h][l] = true;
        }
        matrix
    }
}

struct IsoSearch<'a> {
    a: &'a [Vec<bool>],
    b: &'a [Vec<bool>],
    deg_a: &'a [usize],
    deg_b: &'a [usize],
    mapping: Vec<usize>,
    used: Vec<bool>,
}

impl IsoSearch<'_> {
    fn extend(&mut self, v: usize) -> bool {
        let n = self.mapping.len();
        if v == n {
            return true;
        }
        for w in 0..n {
            if self.used[w] || self.deg_a[v] != self.deg_b[w] {
                continue;
            }
            let consistent = (0..v).all(|u| self.a[v][u] == self.b[w][self.mapping[u]]);
            if !consistent {
                continue;
            }
            self.mapping[v] = w;
            self.used[w] = true;
            if self.extend(v + 1) {
                return true;
            }
            self.used[w] = false;
        }
        false
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.edges.iter().map(|e| (e.low(), e.high())))
            .finish()
    }
}

impl Serialize for Graph {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_pairs().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Graph {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = Vec::<(Vertex, Vertex)>::deserialize(deserializer)?;
        Graph::from_pairs(pairs).map_err(serde::de::Error::custom)
    }
}
