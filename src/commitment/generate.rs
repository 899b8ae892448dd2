//! Random regular-graph construction and candidate-set generation.
//!
//! Construction is Monte-Carlo: vertices are visited in label order and each
//! one is joined to randomly chosen, not yet saturated, later vertices until
//! it reaches the target degree. If some vertex cannot get there the whole
//! attempt is discarded and construction restarts from scratch. Attempts are
//! bounded, so infeasible parameters end in
//! [`CommitmentError::ConstructionFailure`] instead of spinning forever.

use rand::Rng;
use tracing::{debug, trace};

use super::candidates::CandidateSet;
use super::graph::{Edge, Graph, Vertex};
use crate::core::CommitmentError;
use crate::core::constants::{DEFAULT_DEGREE, DEFAULT_MAX_ATTEMPTS, DEFAULT_VERTICES};

/// Parameters for candidate generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Vertex count of each candidate graph.
    pub vertices: u32,

    /// Uniform degree of each candidate graph.
    pub degree: u32,

    /// Restart budget for a single graph, and for re-drawing a whole set.
    pub max_attempts: u32,

    /// Reject candidate sets containing two isomorphic graphs.
    pub require_distinct: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            vertices: DEFAULT_VERTICES,
            degree: DEFAULT_DEGREE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            require_distinct: true,
        }
    }
}

impl GenerationConfig {
    /// Check the parameters admit a regular graph at all.
    ///
    /// A `degree`-regular graph on `vertices` vertices needs
    /// `1 <= degree < vertices` and an even degree sum.
    pub fn is_feasible(&self) -> bool {
        self.degree >= 1
            && self.degree < self.vertices
            && (u64::from(self.vertices) * u64::from(self.degree)) % 2 == 0
    }

    fn failure(&self, attempts: u32) -> CommitmentError {
        CommitmentError::ConstructionFailure {
            vertices: self.vertices,
            degree: self.degree,
            attempts,
        }
    }
}

/// Build a random `degree`-regular graph on `0..vertices`.
pub fn random_regular_graph<R: Rng + ?Sized>(
    vertices: u32,
    degree: u32,
    max_attempts: u32,
    rng: &mut R,
) -> Result<Graph, CommitmentError> {
    let config = GenerationConfig {
        vertices,
        degree,
        max_attempts,
        require_distinct: false,
    };
    if !config.is_feasible() {
        return Err(config.failure(0));
    }

    for attempt in 1..=max_attempts {
        if let Some(graph) = try_construct(vertices as usize, degree as usize, rng) {
            trace!(attempt, vertices, degree, "regular graph constructed");
            return Ok(graph);
        }
    }
    Err(config.failure(max_attempts))
}

fn try_construct<R: Rng + ?Sized>(n: usize, degree: usize, rng: &mut R) -> Option<Graph> {
    let mut adjacent = vec![vec![false; n]; n];
    let mut degrees = vec![0usize; n];

    for i in 0..n {
        // Edges to earlier vertices were recorded when those were visited.
        let needed = degree.saturating_sub(degrees[i]);
        let mut eligible: Vec<usize> = (i + 1..n).filter(|&j| degrees[j] < degree).collect();

        for _ in 0..needed {
            if eligible.is_empty() {
                break;
            }
            let j = eligible.swap_remove(rng.gen_range(0..eligible.len()));
            adjacent[i][j] = true;
            adjacent[j][i] = true;
            degrees[i] += 1;
            degrees[j] += 1;
        }

        if degrees[i] != degree {
            return None;
        }
    }

    let mut graph = Graph::new();
    for (i, row) in adjacent.iter().enumerate() {
        for j in (i + 1..n).filter(|&j| row[j]) {
            graph.insert(Edge::new(i as Vertex, j as Vertex).ok()?);
        }
    }
    Some(graph)
}

/// Generate a fresh candidate set.
///
/// With `require_distinct` set, whole sets are re-drawn until the three
/// graphs are pairwise non-isomorphic, within the same attempt budget.
pub fn generate_candidates<R: Rng + ?Sized>(
    config: &GenerationConfig,
    rng: &mut R,
) -> Result<CandidateSet, CommitmentError> {
    if !config.is_feasible() {
        return Err(config.failure(0));
    }

    for attempt in 1..=config.max_attempts {
        let set = CandidateSet::new([
            random_regular_graph(config.vertices, config.degree, config.max_attempts, rng)?,
            random_regular_graph(config.vertices, config.degree, config.max_attempts, rng)?,
            random_regular_graph(config.vertices, config.degree, config.max_attempts, rng)?,
        ]);

        if !config.require_distinct || set.is_pairwise_distinct() {
            debug!(attempt, "candidate set generated");
            return Ok(set);
        }
    }
    Err(config.failure(config.max_attempts))
}
