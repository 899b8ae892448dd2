//! Player decisions.
//!
//! Prompting a human is outside the protocol. The player driver asks an
//! [`InputProvider`] whenever it needs a decision; [`ScriptedInput`] answers
//! from a fixed script.

use std::collections::VecDeque;

use crate::commitment::{Move, Verdict};

/// Part a player takes in one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sends a hidden commitment first and reveals it last.
    Committer,
    /// Answers a commitment with an unhidden candidate.
    Responder,
}

/// Source of player decisions.
pub trait InputProvider: Send {
    /// Name announced to the opponent.
    fn player_name(&mut self) -> String;

    /// Move for the next turn, given the part this player takes in it.
    fn choose_move(&mut self, role: Role) -> Move;

    /// Whether to play another game after a decisive result.
    fn play_again(&mut self, last: Verdict) -> bool;
}

/// Decisions read from a script.
///
/// Once the moves run out the last one is repeated (Rock for an empty
/// script); once the replay answers run out every answer is `false`.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    name: String,
    moves: VecDeque<Move>,
    replays: VecDeque<bool>,
    last_move: Move,
}

impl ScriptedInput {
    /// Script with a name and no decisions yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            moves: VecDeque::new(),
            replays: VecDeque::new(),
            last_move: Move::Rock,
        }
    }

    /// Append moves, played in order.
    pub fn moves(mut self, moves: impl IntoIterator<Item = Move>) -> Self {
        self.moves.extend(moves);
        self
    }

    /// Append replay answers, given in order.
    pub fn replays(mut self, replays: impl IntoIterator<Item = bool>) -> Self {
        self.replays.extend(replays);
        self
    }
}

impl InputProvider for ScriptedInput {
    fn player_name(&mut self) -> String {
        self.name.clone()
    }

    fn choose_move(&mut self, _role: Role) -> Move {
        if let Some(next) = self.moves.pop_front() {
            self.last_move = next;
        }
        self.last_move
    }

    fn play_again(&mut self, _last: Verdict) -> bool {
        self.replays.pop_front().unwrap_or(false)
    }
}
