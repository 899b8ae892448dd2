//! Relay-side session driver.
//!
//! A [`RelaySession`] owns the two paired connections and runs the protocol
//! phases over them until the session ends:
//! - PREPARE: cross-forward the two names.
//! - SHARE_COMMITMENTS: ask peer-1 for the candidates and relay them to
//!   peer-2 between `START-SEND-GRAPHS` and `END-SEND-GRAPHS`.
//! - TURN: relay commitment, response and reveal, then collect both verdicts.
//! - REPLAY_DECISION: collect and cross-forward both replay answers.
//!
//! The relay never inspects graphs; it only enforces the message kinds each
//! phase allows and checks that the two verdicts agree.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::commitment::Verdict;
use crate::core::constants::CANDIDATE_COUNT;
use crate::core::{ControlToken, Message};
use crate::protocol::{
    Effect, Event, Peer, Phase, ProtocolError, ProtocolResult, Transition, transition,
};
use crate::transport::FramedConnection;

/// Summary of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// Games that reached a decisive round.
    pub games: usize,
    /// Turn rounds played, draws included.
    pub rounds: usize,
    /// Phase the session ended in.
    pub final_phase: Phase,
}

/// One paired session between two peers.
#[derive(Debug)]
pub struct RelaySession<S> {
    peer1: FramedConnection<S>,
    peer2: FramedConnection<S>,
    phase: Phase,
    games: usize,
    rounds: usize,
}

impl<S> RelaySession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session; `peer1` is the connection accepted first.
    pub fn new(peer1: FramedConnection<S>, peer2: FramedConnection<S>) -> Self {
        Self {
            peer1,
            peer2,
            phase: Phase::Prepare,
            games: 0,
            rounds: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Progress so far.
    pub fn report(&self) -> SessionReport {
        SessionReport {
            games: self.games,
            rounds: self.rounds,
            final_phase: self.phase,
        }
    }

    /// Run the session to completion and close both connections.
    ///
    /// Any error ends the session; the relay itself keeps running.
    pub async fn run(mut self) -> ProtocolResult<SessionReport> {
        info!("session started");
        let outcome = self.drive().await;

        self.peer1.close().await;
        self.peer2.close().await;

        match &outcome {
            Ok(report) => info!(
                games = report.games,
                rounds = report.rounds,
                "session finished"
            ),
            Err(e) => warn!(phase = %self.phase, error = %e, "session aborted"),
        }
        outcome
    }

    async fn drive(&mut self) -> ProtocolResult<SessionReport> {
        while !self.phase.is_terminal() {
            let event = self.step().await?;
            let Transition { next, effect } = transition(self.phase, event)?;
            debug!(from = %self.phase, to = %next, ?effect, "phase transition");

            if self.phase == Phase::Turn && next == Phase::ReplayDecision {
                self.games += 1;
            }
            match effect {
                Some(Effect::RepeatRound) => info!(round = self.rounds, "draw, repeating round"),
                Some(Effect::ResetCandidates) => {
                    info!(games = self.games, "both peers replay, fresh candidates")
                }
                Some(Effect::CloseSession) | None => {}
            }
            self.phase = next;
        }
        Ok(self.report())
    }

    async fn step(&mut self) -> ProtocolResult<Event> {
        match self.phase {
            Phase::Prepare => self.exchange_names().await,
            Phase::ShareCommitments => self.share_candidates().await,
            Phase::Turn => self.relay_turn().await,
            Phase::ReplayDecision => self.collect_replay().await,
            Phase::End => Err(ProtocolError::InvalidTransition {
                phase: Phase::End,
                event: "step".into(),
            }),
        }
    }

    async fn exchange_names(&mut self) -> ProtocolResult<Event> {
        let name1 = self.peer1.recv().await?;
        let name2 = self.peer2.recv().await?;
        info!(
            peer1 = %String::from_utf8_lossy(&name1),
            peer2 = %String::from_utf8_lossy(&name2),
            "players joined"
        );

        self.peer1.send(&name2).await?;
        self.peer2.send(&name1).await?;
        Ok(Event::NamesExchanged)
    }

    async fn share_candidates(&mut self) -> ProtocolResult<Event> {
        self.peer1
            .send_message(&ControlToken::NeedGraphs.into())
            .await?;

        let mut graphs = Vec::with_capacity(CANDIDATE_COUNT);
        for _ in 0..CANDIDATE_COUNT {
            graphs.push(self.recv_payload(Peer::One, "candidate graph").await?);
        }

        self.peer2
            .send_message(&ControlToken::StartSendGraphs.into())
            .await?;
        for graph in &graphs {
            self.peer2.send(graph).await?;
        }
        self.peer2
            .send_message(&ControlToken::EndSendGraphs.into())
            .await?;

        debug!(count = graphs.len(), "candidates relayed");
        Ok(Event::CandidatesShared)
    }

    async fn relay_turn(&mut self) -> ProtocolResult<Event> {
        self.rounds += 1;
        debug!(round = self.rounds, "turn started");

        self.peer1
            .send_message(&ControlToken::NeedTurn.into())
            .await?;
        self.peer2
            .send_message(&ControlToken::SendTurn.into())
            .await?;

        let commitment = self.recv_payload(Peer::One, "commitment graph").await?;
        self.peer2.send(&commitment).await?;

        let response = self.recv_payload(Peer::Two, "candidate graph").await?;
        self.peer1.send(&response).await?;

        let reveal = self.recv_payload(Peer::One, "permutation").await?;
        self.peer2.send(&reveal).await?;

        let peer1 = self.recv_verdict(Peer::One).await?;
        let peer2 = self.recv_verdict(Peer::Two).await?;
        info!(round = self.rounds, %peer1, %peer2, "verdicts reported");

        Ok(Event::VerdictsReported { peer1, peer2 })
    }

    async fn collect_replay(&mut self) -> ProtocolResult<Event> {
        let peer1 = self.recv_replay(Peer::One).await?;
        let peer2 = self.recv_replay(Peer::Two).await?;
        debug!(peer1, peer2, "replay answers");

        self.peer1
            .send_message(&ControlToken::replay(peer2).into())
            .await?;
        self.peer2
            .send_message(&ControlToken::replay(peer1).into())
            .await?;
        Ok(Event::ReplayAnswered { peer1, peer2 })
    }

    fn conn(&mut self, peer: Peer) -> &mut FramedConnection<S> {
        match peer {
            Peer::One => &mut self.peer1,
            Peer::Two => &mut self.peer2,
        }
    }

    fn unexpected(&self, expected: &'static str, received: &Message) -> ProtocolError {
        ProtocolError::UnexpectedMessage {
            phase: self.phase,
            expected,
            received: received.describe(),
        }
    }

    async fn recv_payload(&mut self, from: Peer, expected: &'static str) -> ProtocolResult<Vec<u8>> {
        let bytes = self.conn(from).recv().await?;
        Message::expect_payload(bytes).map_err(|other| self.unexpected(expected, &other))
    }

    async fn recv_verdict(&mut self, from: Peer) -> ProtocolResult<Verdict> {
        let bytes = self.conn(from).recv().await?;
        Verdict::from_wire(&bytes).ok_or_else(|| {
            ProtocolError::MalformedVerdict(String::from_utf8_lossy(&bytes).into_owned())
        })
    }

    async fn recv_replay(&mut self, from: Peer) -> ProtocolResult<bool> {
        let bytes = self.conn(from).recv().await?;
        let allowed = [ControlToken::PlayAgainTrue, ControlToken::PlayAgainFalse];
        Message::expect_control(bytes, &allowed)
            .map(|token| token == ControlToken::PlayAgainTrue)
            .map_err(|other| self.unexpected("replay answer", &other))
    }
}
