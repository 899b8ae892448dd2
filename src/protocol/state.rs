//! Session phases and the transition table.
//!
//! ```text
//!   PREPARE ──names──▶ SHARE_COMMITMENTS ──candidates──▶ TURN ◀─┐
//!                            ▲                             │    │ draw
//!                            │ both replay                 ├────┘
//!                            │                             │ decisive
//!                            └──────── REPLAY_DECISION ◀───┘
//!                                            │ otherwise
//!                                            ▼
//!                                           END
//! ```
//!
//! [`transition`] is pure; the relay session performs the I/O for a phase,
//! turns what it observed into an [`Event`], and applies the result.

use std::fmt;

use super::error::{ProtocolError, ProtocolResult};
use crate::commitment::Verdict;
use crate::core::IntegrityError;

/// One of the two paired connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Peer {
    /// First accepted connection; generates candidates and commits.
    One,
    /// Second accepted connection; stores candidates and responds.
    Two,
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::One => f.write_str("peer-1"),
            Peer::Two => f.write_str("peer-2"),
        }
    }
}

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Exchanging player names.
    Prepare,
    /// Peer-1 uploads the candidate set, relayed to peer-2.
    ShareCommitments,
    /// One commit/respond/reveal round plus verdict reports.
    Turn,
    /// Both peers answer whether to play again.
    ReplayDecision,
    /// Terminal.
    End,
}

impl Phase {
    /// Check whether the session is over.
    pub fn is_terminal(self) -> bool {
        self == Phase::End
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Prepare => "PREPARE",
            Phase::ShareCommitments => "SHARE_COMMITMENTS",
            Phase::Turn => "TURN",
            Phase::ReplayDecision => "REPLAY_DECISION",
            Phase::End => "END",
        };
        f.write_str(name)
    }
}

/// What the relay observed while running a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Both names were received and cross-forwarded.
    NamesExchanged,
    /// The candidate set was relayed to peer-2.
    CandidatesShared,
    /// Both verdict codes of a round were received.
    VerdictsReported {
        /// Verdict computed by peer-1.
        peer1: Verdict,
        /// Verdict computed by peer-2.
        peer2: Verdict,
    },
    /// Both replay answers were received and cross-forwarded.
    ReplayAnswered {
        /// Peer-1 wants another game.
        peer1: bool,
        /// Peer-2 wants another game.
        peer2: bool,
    },
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// The round was a draw; play another with the same roles.
    RepeatRound,
    /// Both peers want another game; discard the candidate set.
    ResetCandidates,
    /// Tear the session down.
    CloseSession,
}

/// Result of applying an event to a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Phase to run next.
    pub next: Phase,
    /// Side effect, if any.
    pub effect: Option<Effect>,
}

impl Transition {
    fn to(next: Phase) -> Self {
        Self { next, effect: None }
    }

    fn with(next: Phase, effect: Effect) -> Self {
        Self {
            next,
            effect: Some(effect),
        }
    }
}

/// Apply `event` to `phase`.
///
/// Disagreeing verdicts are an integrity failure; an event that does not
/// belong to `phase` is a protocol violation.
pub fn transition(phase: Phase, event: Event) -> ProtocolResult<Transition> {
    match (phase, event) {
        (Phase::Prepare, Event::NamesExchanged) => Ok(Transition::to(Phase::ShareCommitments)),

        (Phase::ShareCommitments, Event::CandidatesShared) => Ok(Transition::to(Phase::Turn)),

        (Phase::Turn, Event::VerdictsReported { peer1, peer2 }) => {
            if !peer1.agrees_with(peer2) {
                return Err(IntegrityError::VerdictDisagreement { peer1, peer2 }.into());
            }
            if peer1.is_decisive() {
                Ok(Transition::to(Phase::ReplayDecision))
            } else {
                Ok(Transition::with(Phase::Turn, Effect::RepeatRound))
            }
        }

        (Phase::ReplayDecision, Event::ReplayAnswered { peer1, peer2 }) => {
            if peer1 && peer2 {
                Ok(Transition::with(
                    Phase::ShareCommitments,
                    Effect::ResetCandidates,
                ))
            } else {
                Ok(Transition::with(Phase::End, Effect::CloseSession))
            }
        }

        (phase, event) => Err(ProtocolError::InvalidTransition {
            phase,
            event: format!("{event:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let t = transition(Phase::Prepare, Event::NamesExchanged).unwrap();
        assert_eq!(t, Transition::to(Phase::ShareCommitments));

        let t = transition(Phase::ShareCommitments, Event::CandidatesShared).unwrap();
        assert_eq!(t, Transition::to(Phase::Turn));
    }

    #[test]
    fn test_decisive_round_advances_to_replay() {
        let event = Event::VerdictsReported {
            peer1: Verdict::Win,
            peer2: Verdict::Lose,
        };
        let t = transition(Phase::Turn, event).unwrap();
        assert_eq!(t.next, Phase::ReplayDecision);
        assert_eq!(t.effect, None);
    }

    #[test]
    fn test_draw_repeats_turn() {
        let event = Event::VerdictsReported {
            peer1: Verdict::Draw,
            peer2: Verdict::Draw,
        };
        let t = transition(Phase::Turn, event).unwrap();
        assert_eq!(t, Transition::with(Phase::Turn, Effect::RepeatRound));
    }

    #[test]
    fn test_disagreeing_verdicts_are_integrity_failure() {
        for (peer1, peer2) in [
            (Verdict::Win, Verdict::Win),
            (Verdict::Lose, Verdict::Lose),
            (Verdict::Draw, Verdict::Win),
            (Verdict::Lose, Verdict::Draw),
        ] {
            let err = transition(Phase::Turn, Event::VerdictsReported { peer1, peer2 }).unwrap_err();
            assert!(err.is_integrity_violation(), "{peer1} / {peer2}");
        }
    }

    #[test]
    fn test_replay_decision() {
        let both = Event::ReplayAnswered {
            peer1: true,
            peer2: true,
        };
        assert_eq!(
            transition(Phase::ReplayDecision, both).unwrap(),
            Transition::with(Phase::ShareCommitments, Effect::ResetCandidates)
        );

        for (peer1, peer2) in [(true, false), (false, true), (false, false)] {
            let t = transition(Phase::ReplayDecision, Event::ReplayAnswered { peer1, peer2 })
                .unwrap();
            assert_eq!(t, Transition::with(Phase::End, Effect::CloseSession));
            assert!(t.next.is_terminal());
        }
    }

    #[test]
    fn test_out_of_phase_events_rejected() {
        let err = transition(Phase::Prepare, Event::CandidatesShared).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidTransition {
                phase: Phase::Prepare,
                ..
            }
        ));

        assert!(transition(Phase::End, Event::NamesExchanged).is_err());
        assert!(
            transition(
                Phase::ShareCommitments,
                Event::ReplayAnswered {
                    peer1: true,
                    peer2: true
                }
            )
            .is_err()
        );
    }
}
