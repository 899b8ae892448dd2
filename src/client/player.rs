//! Peer-side protocol driver.
//!
//! A [`Player`] answers the relay phase by phase. The first connection to a
//! relay (peer-1) generates the candidates and always commits; the second
//! (peer-2) stores the relayed candidates and always responds. Each side
//! computes its verdict locally and reports only the code.

use std::net::SocketAddr;

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::input::{InputProvider, Role};
use crate::commitment::{
    CandidateSet, GenerationConfig, Graph, GraphCodec, JsonCodec, Move, Verdict,
    generate_candidates,
};
use crate::core::constants::{CANDIDATE_COUNT, DEFAULT_MAX_MESSAGE_SIZE};
use crate::core::{CommitmentError, ControlToken, IntegrityError, Message};
use crate::protocol::{Peer, Phase, ProtocolError, ProtocolResult};
use crate::transport::{FramedConnection, TransportError};

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failed to connect to the relay.
    #[error("connection to {addr} failed: {source}")]
    ConnectionFailed {
        /// Relay address.
        addr: SocketAddr,
        /// Underlying socket error.
        source: std::io::Error,
    },

    /// Discovery or socket failure outside a session.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The fallback relay could not be started.
    #[cfg(feature = "server")]
    #[error("relay error: {0}")]
    Relay(#[from] crate::server::RelayError),

    /// The session failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Candidate generation parameters, used when this player is peer-1.
    pub generation: GenerationConfig,

    /// Largest payload accepted from the relay.
    pub max_message_size: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

/// Builder for a [`PlayerConfig`].
#[derive(Debug)]
pub struct PlayerBuilder {
    config: PlayerConfig,
}

impl PlayerBuilder {
    /// Create a new player builder.
    pub fn new() -> Self {
        Self {
            config: PlayerConfig::default(),
        }
    }

    /// Set the vertex count of generated candidates.
    pub fn vertices(mut self, vertices: u32) -> Self {
        self.config.generation.vertices = vertices;
        self
    }

    /// Set the degree of generated candidates.
    pub fn degree(mut self, degree: u32) -> Self {
        self.config.generation.degree = degree;
        self
    }

    /// Set the construction retry budget.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.generation.max_attempts = attempts;
        self
    }

    /// Require pairwise non-isomorphic candidates.
    pub fn require_distinct(mut self, required: bool) -> Self {
        self.config.generation.require_distinct = required;
        self
    }

    /// Set the maximum accepted payload size.
    pub fn max_message_size(mut self, max: usize) -> Self {
        self.config.max_message_size = max;
        self
    }

    /// Build the player configuration.
    pub fn build(self) -> PlayerConfig {
        self.config
    }
}

impl Default for PlayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One finished turn from this player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Round number within the session, starting at 1.
    pub round: usize,
    /// Part this player took.
    pub role: Role,
    /// Move this player made.
    pub own: Move,
    /// Move recovered for the opponent.
    pub opponent: Move,
    /// Locally computed verdict, as reported to the relay.
    pub verdict: Verdict,
}

/// Record of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    /// Name announced by the opponent.
    pub opponent: String,
    /// Seat this player held.
    pub seat: Peer,
    /// Games played to a decisive result.
    pub games: usize,
    /// Every round, draws included.
    pub rounds: Vec<RoundOutcome>,
}

impl GameSummary {
    fn count(&self, verdict: Verdict) -> usize {
        self.rounds.iter().filter(|r| r.verdict == verdict).count()
    }

    /// Rounds won.
    pub fn wins(&self) -> usize {
        self.count(Verdict::Win)
    }

    /// Rounds lost.
    pub fn losses(&self) -> usize {
        self.count(Verdict::Lose)
    }

    /// Rounds drawn.
    pub fn draws(&self) -> usize {
        self.count(Verdict::Draw)
    }

    /// Verdict of the last round played.
    pub fn last_verdict(&self) -> Option<Verdict> {
        self.rounds.last().map(|r| r.verdict)
    }
}

fn require(candidates: &Option<CandidateSet>) -> ProtocolResult<&CandidateSet> {
    candidates
        .as_ref()
        .ok_or_else(|| ProtocolError::InvalidTransition {
            phase: Phase::Turn,
            event: "turn before candidates were shared".into(),
        })
}

/// A peer connected to a relay.
pub struct Player<S, I> {
    conn: FramedConnection<S>,
    input: I,
    codec: Box<dyn GraphCodec>,
    config: PlayerConfig,
    rng: StdRng,
    phase: Phase,
    candidates: Option<CandidateSet>,
    rounds: usize,
}

impl<I: InputProvider> Player<TcpStream, I> {
    /// Connect to a relay over TCP.
    pub async fn connect(
        addr: SocketAddr,
        input: I,
        config: PlayerConfig,
    ) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::ConnectionFailed { addr, source })?;
        stream.set_nodelay(true).map_err(TransportError::from)?;
        info!(relay = %addr, "connected");

        let conn = FramedConnection::new(stream).with_max_payload(config.max_message_size);
        Ok(Self::new(conn, input, config))
    }
}

impl<S, I> Player<S, I>
where
    S: AsyncRead + AsyncWrite + Unpin,
    I: InputProvider,
{
    /// Create a player over an established connection.
    pub fn new(conn: FramedConnection<S>, input: I, config: PlayerConfig) -> Self {
        Self {
            conn,
            input,
            codec: Box::new(JsonCodec),
            config,
            rng: StdRng::from_entropy(),
            phase: Phase::Prepare,
            candidates: None,
            rounds: 0,
        }
    }

    /// Use a specific random source.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Use a different payload codec. Both peers must agree on it.
    pub fn with_codec(mut self, codec: impl GraphCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Phase this player is in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Candidates of the current game, once shared.
    pub fn candidates(&self) -> Option<&CandidateSet> {
        self.candidates.as_ref()
    }

    /// Send this player's name and receive the opponent's.
    pub async fn exchange_names(&mut self) -> ProtocolResult<String> {
        self.phase = Phase::Prepare;
        let name = self.input.player_name();
        self.conn.send(name.as_bytes()).await?;
        info!(%name, "waiting for an opponent");

        let opponent = String::from_utf8_lossy(&self.conn.recv().await?).into_owned();
        info!(%opponent, "opponent joined");
        Ok(opponent)
    }

    /// Generate and upload candidates (peer-1) or receive them (peer-2).
    ///
    /// Returns the seat the relay assigned.
    pub async fn share_candidates(&mut self) -> ProtocolResult<Peer> {
        self.phase = Phase::ShareCommitments;
        self.candidates = None;

        let allowed = [ControlToken::NeedGraphs, ControlToken::StartSendGraphs];
        let token = self.recv_control("candidate request", &allowed).await?;

        let (set, seat) = if token == ControlToken::NeedGraphs {
            let set = generate_candidates(&self.config.generation, &mut self.rng)?;
            for graph in set.graphs() {
                let bytes = self.codec.encode_graph(graph)?;
                self.conn.send(&bytes).await?;
            }
            info!("candidates generated and sent");
            (set, Peer::One)
        } else {
            let set = self.receive_candidates().await?;
            let vertices = self.config.generation.vertices;
            if set.graphs().iter().any(|g| g.vertex_count() != vertices) {
                warn!(expected = vertices, "received candidates have an unexpected vertex count");
            } else if self.config.generation.require_distinct && !set.is_pairwise_distinct() {
                warn!("received candidates are not pairwise distinct, a commitment may open as more than one move");
            }
            info!("candidates received");
            (set, Peer::Two)
        };

        debug!(candidates = ?set, %seat, "candidate set ready");
        self.candidates = Some(set);
        Ok(seat)
    }

    async fn receive_candidates(&mut self) -> ProtocolResult<CandidateSet> {
        let mut graphs = Vec::with_capacity(CANDIDATE_COUNT);
        loop {
            let bytes = self.conn.recv().await?;
            match Message::classify(bytes) {
                Message::Control(ControlToken::EndSendGraphs) => break,
                Message::Payload(bytes) if graphs.len() < CANDIDATE_COUNT => {
                    graphs.push(self.decode_graph(&bytes)?);
                }
                Message::Payload(_) => {
                    return Err(ProtocolError::CandidateCount {
                        expected: CANDIDATE_COUNT,
                        received: graphs.len() + 1,
                    });
                }
                other => return Err(self.unexpected("candidate graph", &other)),
            }
        }

        let received = graphs.len();
        CandidateSet::from_vec(graphs).ok_or(ProtocolError::CandidateCount {
            expected: CANDIDATE_COUNT,
            received,
        })
    }

    /// Play one turn in whichever role the relay requests and report the
    /// verdict.
    ///
    /// An opening that matches no candidate ends the session before any
    /// verdict is sent.
    pub async fn play_round(&mut self) -> ProtocolResult<RoundOutcome> {
        self.phase = Phase::Turn;
        require(&self.candidates)?;

        let allowed = [ControlToken::NeedTurn, ControlToken::SendTurn];
        let role = match self.recv_control("turn request", &allowed).await? {
            ControlToken::NeedTurn => Role::Committer,
            _ => Role::Responder,
        };

        let (own, opponent) = match role {
            Role::Committer => self.commit_turn().await?,
            Role::Responder => self.respond_turn().await?,
        };

        let verdict = own.against(opponent);
        self.conn.send(&verdict.to_wire()).await?;
        self.rounds += 1;

        info!(round = self.rounds, ?role, %own, %opponent, %verdict, "round finished");
        Ok(RoundOutcome {
            round: self.rounds,
            role,
            own,
            opponent,
            verdict,
        })
    }

    async fn commit_turn(&mut self) -> ProtocolResult<(Move, Move)> {
        let own = self.input.choose_move(Role::Committer);
        let sealed = require(&self.candidates)?.seal(own, &mut self.rng)?;
        let bytes = self.codec.encode_graph(&sealed.commitment)?;
        self.conn.send(&bytes).await?;

        let bytes = self.recv_payload("opponent candidate").await?;
        let answer = self.decode_graph(&bytes).map_err(|e| {
            warn!(error = %e, "unusable candidate answered");
            IntegrityError::UnknownCandidate
        })?;
        let opponent = require(&self.candidates)?.identify(&answer)?;

        let bytes = self.codec.encode_permutation(&sealed.permutation)?;
        self.conn.send(&bytes).await?;
        Ok((own, opponent))
    }

    async fn respond_turn(&mut self) -> ProtocolResult<(Move, Move)> {
        let bytes = self.recv_payload("commitment graph").await?;
        let commitment = self.decode_graph(&bytes).map_err(|e| {
            warn!(error = %e, "unusable commitment received");
            IntegrityError::UnmatchedCommitment
        })?;

        let own = self.input.choose_move(Role::Responder);
        let bytes = self.codec.encode_graph(require(&self.candidates)?.get(own))?;
        self.conn.send(&bytes).await?;

        let bytes = self.recv_payload("permutation").await?;
        let permutation = self.codec.decode_permutation(&bytes).map_err(|e| {
            warn!(error = %e, "unusable permutation revealed");
            IntegrityError::UnmatchedCommitment
        })?;
        let opponent = require(&self.candidates)?.open(&commitment, &permutation)?;
        Ok((own, opponent))
    }

    /// Answer the replay question and learn the opponent's answer.
    ///
    /// Returns `true` only if both want another game.
    pub async fn decide_replay(&mut self, last: Verdict) -> ProtocolResult<bool> {
        self.phase = Phase::ReplayDecision;
        let own = self.input.play_again(last);
        self.conn
            .send_message(&ControlToken::replay(own).into())
            .await?;

        let allowed = [ControlToken::PlayAgainTrue, ControlToken::PlayAgainFalse];
        let opponent = self.recv_control("replay answer", &allowed).await? == ControlToken::PlayAgainTrue;
        debug!(own, opponent, "replay answers");

        let again = own && opponent;
        if !again {
            self.phase = Phase::End;
        }
        Ok(again)
    }

    /// Play the whole session and close the connection.
    pub async fn play_session(mut self) -> ProtocolResult<GameSummary> {
        let outcome = self.drive_session().await;
        self.conn.close().await;

        match &outcome {
            Ok(summary) => info!(
                games = summary.games,
                wins = summary.wins(),
                losses = summary.losses(),
                "session finished"
            ),
            Err(e) => warn!(phase = %self.phase, error = %e, "session aborted"),
        }
        outcome
    }

    async fn drive_session(&mut self) -> ProtocolResult<GameSummary> {
        let opponent = self.exchange_names().await?;
        let seat = self.share_candidates().await?;
        let mut summary = GameSummary {
            opponent,
            seat,
            games: 0,
            rounds: Vec::new(),
        };

        loop {
            let last = loop {
                let outcome = self.play_round().await?;
                summary.rounds.push(outcome);
                if outcome.verdict.is_decisive() {
                    break outcome.verdict;
                }
            };
            summary.games += 1;

            if !self.decide_replay(last).await? {
                break;
            }
            self.share_candidates().await?;
        }
        Ok(summary)
    }

    /// Decode a graph from the opponent, limited to the configured labels.
    fn decode_graph(&self, bytes: &[u8]) -> Result<Graph, CommitmentError> {
        let graph = self.codec.decode_graph(bytes)?;
        graph.check_labels(self.config.generation.vertices)?;
        Ok(graph)
    }

    fn unexpected(&self, expected: &'static str, received: &Message) -> ProtocolError {
        ProtocolError::UnexpectedMessage {
            phase: self.phase,
            expected,
            received: received.describe(),
        }
    }

    async fn recv_payload(&mut self, expected: &'static str) -> ProtocolResult<Vec<u8>> {
        let bytes = self.conn.recv().await?;
        Message::expect_payload(bytes).map_err(|other| self.unexpected(expected, &other))
    }

    async fn recv_control(
        &mut self,
        expected: &'static str,
        allowed: &[ControlToken],
    ) -> ProtocolResult<ControlToken> {
        let bytes = self.conn.recv().await?;
        Message::expect_control(bytes, allowed).map_err(|other| self.unexpected(expected, &other))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{DuplexStream, duplex};

    use super::*;
    use crate::client::ScriptedInput;

    type Conn = FramedConnection<DuplexStream>;

    fn setup(input: ScriptedInput) -> (Player<DuplexStream, ScriptedInput>, Conn) {
        let (a, b) = duplex(64 * 1024);
        let player = Player::new(FramedConnection::new(a), input, PlayerConfig::default())
            .with_rng(StdRng::seed_from_u64(7));
        (player, FramedConnection::new(b))
    }

    fn candidates(seed: u64) -> CandidateSet {
        let mut rng = StdRng::seed_from_u64(seed);
        generate_candidates(&GenerationConfig::default(), &mut rng).unwrap()
    }

    async fn send_candidates(relay: &mut Conn, graphs: &[crate::commitment::Graph]) {
        relay
            .send_message(&ControlToken::StartSendGraphs.into())
            .await
            .unwrap();
        for graph in graphs {
            relay.send(&JsonCodec.encode_graph(graph).unwrap()).await.unwrap();
        }
        relay
            .send_message(&ControlToken::EndSendGraphs.into())
            .await
            .unwrap();
    }

    #[test]
    fn test_builder() {
        let config = PlayerBuilder::new()
            .vertices(12)
            .degree(3)
            .max_attempts(50)
            .require_distinct(false)
            .max_message_size(4096)
            .build();
        assert_eq!(config.generation.vertices, 12);
        assert_eq!(config.generation.degree, 3);
        assert_eq!(config.generation.max_attempts, 50);
        assert!(!config.generation.require_distinct);
        assert_eq!(config.max_message_size, 4096);
    }

    #[tokio::test]
    async fn test_exchange_names() {
        let (mut player, mut relay) = setup(ScriptedInput::new("alice"));
        relay.send(b"bob").await.unwrap();
        assert_eq!(player.exchange_names().await.unwrap(), "bob");
        assert_eq!(relay.recv().await.unwrap(), b"alice");
    }

    #[tokio::test]
    async fn test_generates_candidates_as_peer_one() {
        let (mut player, mut relay) = setup(ScriptedInput::new("alice"));
        relay
            .send_message(&ControlToken::NeedGraphs.into())
            .await
            .unwrap();

        assert_eq!(player.share_candidates().await.unwrap(), Peer::One);
        let mut uploaded = Vec::new();
        for _ in 0..CANDIDATE_COUNT {
            uploaded.push(JsonCodec.decode_graph(&relay.recv().await.unwrap()).unwrap());
        }
        let uploaded = CandidateSet::from_vec(uploaded).unwrap();
        assert_eq!(player.candidates(), Some(&uploaded));
        assert!(uploaded.is_pairwise_distinct());
        assert!(uploaded.graphs().iter().all(|g| g.is_regular(2)));
    }

    #[tokio::test]
    async fn test_receives_candidates_as_peer_two() {
        let (mut player, mut relay) = setup(ScriptedInput::new("bob"));
        let set = candidates(3);
        send_candidates(&mut relay, set.graphs()).await;

        assert_eq!(player.share_candidates().await.unwrap(), Peer::Two);
        assert_eq!(player.candidates(), Some(&set));
        assert_eq!(player.phase(), Phase::ShareCommitments);
    }

    #[tokio::test]
    async fn test_wrong_candidate_count() {
        let set = candidates(4);

        let (mut player, mut relay) = setup(ScriptedInput::new("bob"));
        send_candidates(&mut relay, &set.graphs()[..2]).await;
        let err = player.share_candidates().await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::CandidateCount {
                expected: 3,
                received: 2
            }
        ));

        let (mut player, mut relay) = setup(ScriptedInput::new("bob"));
        let mut extra = set.graphs().to_vec();
        extra.push(set.graphs()[0].clone());
        send_candidates(&mut relay, &extra).await;
        let err = player.share_candidates().await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::CandidateCount {
                expected: 3,
                received: 4
            }
        ));
    }

    #[tokio::test]
    async fn test_candidate_labels_out_of_range() {
        let (mut player, mut relay) = setup(ScriptedInput::new("bob"));
        relay
            .send_message(&ControlToken::StartSendGraphs.into())
            .await
            .unwrap();
        for _ in 0..3 {
            relay.send(b"[[0,4294967295]]").await.unwrap();
        }
        let err = player.share_candidates().await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Commitment(CommitmentError::Codec(_))
        ));
        assert!(player.candidates().is_none());

        // Decodable, but past the configured vertex count.
        let (mut player, mut relay) = setup(ScriptedInput::new("bob"));
        relay
            .send_message(&ControlToken::StartSendGraphs.into())
            .await
            .unwrap();
        relay.send(b"[[0,10]]").await.unwrap();
        let err = player.share_candidates().await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Commitment(CommitmentError::LabelOutOfRange {
                vertex: 10,
                limit: 10
            })
        ));
    }

    #[tokio::test]
    async fn test_undecodable_commitment_is_integrity_failure() {
        let (mut player, mut relay) = setup(ScriptedInput::new("bob"));
        send_candidates(&mut relay, candidates(6).graphs()).await;
        player.share_candidates().await.unwrap();

        relay
            .send_message(&ControlToken::SendTurn.into())
            .await
            .unwrap();
        relay.send(b"[[4,4],[0,1]]").await.unwrap();

        let err = player.play_round().await.unwrap_err();
        assert!(err.is_integrity_violation());
        assert!(matches!(
            err,
            ProtocolError::Integrity(IntegrityError::UnmatchedCommitment)
        ));

        // Nothing was answered.
        drop(player);
        assert!(relay.recv().await.unwrap_err().is_connection_closed());
    }

    #[tokio::test]
    async fn test_undecodable_answer_is_unknown_candidate() {
        let (mut player, mut relay) = setup(ScriptedInput::new("alice"));
        relay
            .send_message(&ControlToken::NeedGraphs.into())
            .await
            .unwrap();
        assert_eq!(player.share_candidates().await.unwrap(), Peer::One);
        for _ in 0..3 {
            relay.recv().await.unwrap();
        }

        relay
            .send_message(&ControlToken::NeedTurn.into())
            .await
            .unwrap();
        relay.send(b"not a graph").await.unwrap();

        let err = player.play_round().await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Integrity(IntegrityError::UnknownCandidate)
        ));

        // The commitment went out, the permutation did not.
        relay.recv().await.unwrap();
        drop(player);
        assert!(relay.recv().await.unwrap_err().is_connection_closed());
    }

    #[tokio::test]
    async fn test_out_of_phase_token() {
        let (mut player, mut relay) = setup(ScriptedInput::new("bob"));
        relay
            .send_message(&ControlToken::NeedTurn.into())
            .await
            .unwrap();

        let err = player.share_candidates().await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedMessage {
                phase: Phase::ShareCommitments,
                expected: "candidate request",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_round_requires_candidates() {
        let (mut player, _relay) = setup(ScriptedInput::new("alice"));
        let err = player.play_round().await.unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_responder_round() {
        let (mut player, mut relay) =
            setup(ScriptedInput::new("bob").moves([Move::Scissor]));
        let set = candidates(5);
        send_candidates(&mut relay, set.graphs()).await;
        player.share_candidates().await.unwrap();

        // Opponent commits to Rock.
        let mut rng = StdRng::seed_from_u64(11);
        let sealed = set.seal(Move::Rock, &mut rng).unwrap();
        relay
            .send_message(&ControlToken::SendTurn.into())
            .await
            .unwrap();
        relay
            .send(&JsonCodec.encode_graph(&sealed.commitment).unwrap())
            .await
            .unwrap();
        relay
            .send(&JsonCodec.encode_permutation(&sealed.permutation).unwrap())
            .await
            .unwrap();

        let outcome = player.play_round().await.unwrap();
        assert_eq!(outcome.role, Role::Responder);
        assert_eq!(outcome.own, Move::Scissor);
        assert_eq!(outcome.opponent, Move::Rock);
        assert_eq!(outcome.verdict, Verdict::Lose);

        let answer = JsonCodec.decode_graph(&relay.recv().await.unwrap()).unwrap();
        assert_eq!(&answer, set.get(Move::Scissor));
        assert_eq!(relay.recv().await.unwrap(), Verdict::Lose.to_wire());
    }

    #[tokio::test]
    async fn test_replay_needs_both() {
        let (mut player, mut relay) = setup(ScriptedInput::new("alice").replays([true, true]));

        relay
            .send_message(&ControlToken::PlayAgainTrue.into())
            .await
            .unwrap();
        assert!(player.decide_replay(Verdict::Win).await.unwrap());
        assert_eq!(
            relay.recv_message().await.unwrap(),
            Message::Control(ControlToken::PlayAgainTrue)
        );

        relay
            .send_message(&ControlToken::PlayAgainFalse.into())
            .await
            .unwrap();
        assert!(!player.decide_replay(Verdict::Lose).await.unwrap());
        assert_eq!(player.phase(), Phase::End);
    }
}
