//! Graph-isomorphism commitment scheme.
//!
//! Each game uses three candidate graphs, one per move. A turn is an
//! asymmetric commit-then-reveal:
//!
//! 1. The acting peer relabels its chosen candidate with a random
//!    [`Permutation`] and sends only the relabeled graph.
//! 2. The opponent answers with its own chosen candidate, unhidden.
//! 3. The acting peer reveals the permutation; the opponent inverts it and
//!    matches the result against the candidate set to learn the move.
//!
//! The relabeled graph binds the acting peer only if the three candidates are
//! pairwise non-isomorphic, which [`generate_candidates`] enforces by default.

mod candidates;
mod codec;
mod generate;
mod graph;
mod permutation;

pub use candidates::*;
pub use codec::*;
pub use generate::*;
pub use graph::*;
pub use permutation::*;
