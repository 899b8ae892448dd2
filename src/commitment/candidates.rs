//! Candidate sets, moves, and verdicts.

use std::fmt;

use rand::Rng;

use super::graph::Graph;
use super::permutation::Permutation;
use crate::core::constants::CANDIDATE_COUNT;
use crate::core::{CommitmentError, IntegrityError};

/// A move, identified by its candidate index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    /// Index 0.
    Rock,
    /// Index 1.
    Paper,
    /// Index 2.
    Scissor,
}

impl Move {
    /// All moves in index order.
    pub const ALL: [Move; CANDIDATE_COUNT] = [Move::Rock, Move::Paper, Move::Scissor];

    /// Candidate index of this move.
    pub fn index(self) -> usize {
        match self {
            Move::Rock => 0,
            Move::Paper => 1,
            Move::Scissor => 2,
        }
    }

    /// Move for a candidate index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Check if this move beats the other.
    pub fn beats(self, other: Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissor) | (Move::Paper, Move::Rock) | (Move::Scissor, Move::Paper)
        )
    }

    /// Verdict from the perspective of the player who played `self`.
    pub fn against(self, other: Move) -> Verdict {
        if self == other {
            Verdict::Draw
        } else if self.beats(other) {
            Verdict::Win
        } else {
            Verdict::Lose
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Rock => "Rock",
            Move::Paper => "Paper",
            Move::Scissor => "Scissor",
        };
        f.write_str(name)
    }
}

/// Outcome of a round from one peer's perspective.
///
/// Wire codes are decimal strings: WIN `1`, LOSE `0`, DRAW `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// This peer won.
    Win,
    /// This peer lost.
    Lose,
    /// Nobody won.
    Draw,
}

impl Verdict {
    /// Signed verdict code.
    pub fn code(self) -> i8 {
        match self {
            Verdict::Win => 1,
            Verdict::Lose => 0,
            Verdict::Draw => -1,
        }
    }

    /// Verdict for a signed code.
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            1 => Some(Verdict::Win),
            0 => Some(Verdict::Lose),
            -1 => Some(Verdict::Draw),
            _ => None,
        }
    }

    /// Decimal string encoding for the wire.
    pub fn to_wire(self) -> Vec<u8> {
        self.code().to_string().into_bytes()
    }

    /// Parse the decimal string encoding.
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(bytes).ok()?;
        text.trim().parse::<i8>().ok().and_then(Self::from_code)
    }

    /// The verdict the opponent must have computed.
    pub fn opposite(self) -> Self {
        match self {
            Verdict::Win => Verdict::Lose,
            Verdict::Lose => Verdict::Win,
            Verdict::Draw => Verdict::Draw,
        }
    }

    /// Check that two independently computed verdicts are consistent.
    pub fn agrees_with(self, other: Verdict) -> bool {
        self.opposite() == other
    }

    /// Check whether the round produced a winner.
    pub fn is_decisive(self) -> bool {
        self != Verdict::Draw
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::Win => "WIN",
            Verdict::Lose => "LOSE",
            Verdict::Draw => "DRAW",
        };
        write!(f, "{name}({})", self.code())
    }
}

/// A hidden choice: the relabeled graph to send now, and the permutation
/// to reveal later.
#[derive(Debug, Clone)]
pub struct SealedChoice {
    /// The move that was committed to.
    pub choice: Move,
    /// Relabeled candidate graph, safe to send before the reveal.
    pub commitment: Graph,
    /// Relabeling used; withheld until the opponent has answered.
    pub permutation: Permutation,
}

/// The three candidate graphs of a game, indexed by [`Move`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    graphs: [Graph; CANDIDATE_COUNT],
}

impl CandidateSet {
    /// Create a set; index `i` encodes `Move::from_index(i)`.
    pub fn new(graphs: [Graph; CANDIDATE_COUNT]) -> Self {
        Self { graphs }
    }

    /// Build a set from received graphs, requiring exactly three.
    pub fn from_vec(graphs: Vec<Graph>) -> Option<Self> {
        let graphs: [Graph; CANDIDATE_COUNT] = graphs.try_into().ok()?;
        Some(Self::new(graphs))
    }

    /// Candidate graph for a move.
    pub fn get(&self, choice: Move) -> &Graph {
        &self.graphs[choice.index()]
    }

    /// All candidates in index order.
    pub fn graphs(&self) -> &[Graph; CANDIDATE_COUNT] {
        &self.graphs
    }

    /// Find the move whose candidate has exactly this edge set.
    pub fn index_of(&self, graph: &Graph) -> Option<Move> {
        self.graphs
            .iter()
            .position(|candidate| candidate == graph)
            .and_then(Move::from_index)
    }

    /// Check that no two candidates are relabelings of each other.
    ///
    /// The commitment only binds the committer if this holds: isomorphic
    /// candidates let one commitment be opened as either move.
    pub fn is_pairwise_distinct(&self) -> bool {
        let [a, b, c] = &self.graphs;
        !a.is_isomorphic_to(b) && !a.is_isomorphic_to(c) && !b.is_isomorphic_to(c)
    }

    /// Commit to `choice` by relabeling its candidate with a fresh random
    /// permutation.
    pub fn seal<R: Rng + ?Sized>(
        &self,
        choice: Move,
        rng: &mut R,
    ) -> Result<SealedChoice, CommitmentError> {
        let candidate = self.get(choice);
        let permutation = Permutation::random(candidate.vertex_count(), rng);
        let commitment = permutation.apply(candidate)?;
        Ok(SealedChoice {
            choice,
            commitment,
            permutation,
        })
    }

    /// Open a commitment with the revealed permutation and recover the move.
    ///
    /// A permutation that cannot be inverted onto a stored candidate is an
    /// integrity failure, whatever the reason.
    pub fn open(
        &self,
        commitment: &Graph,
        permutation: &Permutation,
    ) -> Result<Move, IntegrityError> {
        let plain = permutation
            .inverse()
            .apply(commitment)
            .map_err(|_| IntegrityError::UnmatchedCommitment)?;
        self.index_of(&plain)
            .ok_or(IntegrityError::UnmatchedCommitment)
    }

    /// Recover the move of an unhidden candidate sent by the opponent.
    pub fn identify(&self, graph: &Graph) -> Result<Move, IntegrityError> {
        self.index_of(graph).ok_or(IntegrityError::UnknownCandidate)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::commitment::generate::{GenerationConfig, generate_candidates};

    fn candidates(seed: u64) -> (CandidateSet, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let set = generate_candidates(&GenerationConfig::default(), &mut rng).unwrap();
        (set, rng)
    }

    #[test]
    fn test_verdict_antisymmetric() {
        for a in Move::ALL {
            assert_eq!(a.against(a), Verdict::Draw);
            for b in Move::ALL {
                if a != b {
                    assert_eq!(a.against(b) == Verdict::Win, b.against(a) == Verdict::Lose);
                    assert!(a.against(b).agrees_with(b.against(a)));
                }
            }
        }
    }

    #[test]
    fn test_cyclic_relation() {
        assert_eq!(Move::Rock.against(Move::Scissor), Verdict::Win);
        assert_eq!(Move::Paper.against(Move::Rock), Verdict::Win);
        assert_eq!(Move::Scissor.against(Move::Paper), Verdict::Win);
        assert_eq!(Move::Scissor.against(Move::Rock), Verdict::Lose);
    }

    #[test]
    fn test_verdict_wire_codes() {
        assert_eq!(Verdict::Win.to_wire(), b"1");
        assert_eq!(Verdict::Lose.to_wire(), b"0");
        assert_eq!(Verdict::Draw.to_wire(), b"-1");
        assert_eq!(Verdict::from_wire(b"-1"), Some(Verdict::Draw));
        assert_eq!(Verdict::from_wire(b"2"), None);
        assert_eq!(Verdict::from_wire(b"WIN"), None);
    }

    #[test]
    fn test_agreement_table() {
        assert!(Verdict::Draw.agrees_with(Verdict::Draw));
        assert!(Verdict::Win.agrees_with(Verdict::Lose));
        assert!(Verdict::Lose.agrees_with(Verdict::Win));
        assert!(!Verdict::Win.agrees_with(Verdict::Win));
        assert!(!Verdict::Draw.agrees_with(Verdict::Lose));
    }

    #[test]
    fn test_open_recovers_committed_move() {
        let (set, mut rng) = candidates(21);
        for choice in Move::ALL {
            for _ in 0..10 {
                let sealed = set.seal(choice, &mut rng).unwrap();
                assert_eq!(set.open(&sealed.commitment, &sealed.permutation), Ok(choice));
            }
        }
    }

    #[test]
    fn test_wrong_permutation_does_not_open_as_other_move() {
        let (set, mut rng) = candidates(22);
        let sealed = set.seal(Move::Paper, &mut rng).unwrap();
        let other = Permutation::random(sealed.permutation.len() as u32, &mut rng);
        match set.open(&sealed.commitment, &other) {
            Ok(choice) => assert_eq!(choice, Move::Paper),
            Err(err) => assert_eq!(err, IntegrityError::UnmatchedCommitment),
        }
    }

    #[test]
    fn test_corrupted_commitment_is_unmatched() {
        let (set, mut rng) = candidates(23);
        let sealed = set.seal(Move::Rock, &mut rng).unwrap();

        let mut pairs = sealed.commitment.to_pairs();
        pairs.pop();
        let corrupted = Graph::from_pairs(pairs).unwrap();

        assert_eq!(
            set.open(&corrupted, &sealed.permutation),
            Err(IntegrityError::UnmatchedCommitment)
        );
    }

    #[test]
    fn test_identify_plain_choice() {
        let (set, _) = candidates(24);
        assert_eq!(set.identify(set.get(Move::Scissor)), Ok(Move::Scissor));
        assert_eq!(
            set.identify(&Graph::new()),
            Err(IntegrityError::UnknownCandidate)
        );
    }

    #[test]
    fn test_from_vec_requires_three() {
        let (set, _) = candidates(25);
        let mut graphs = set.graphs().to_vec();
        assert_eq!(CandidateSet::from_vec(graphs.clone()), Some(set));
        graphs.pop();
        assert_eq!(CandidateSet::from_vec(graphs), None);
    }
}
