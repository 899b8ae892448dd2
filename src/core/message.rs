//! Typed view of framed payloads.
//!
//! A payload on the wire is either one of a closed set of ASCII control
//! tokens or opaque bytes (a serialized graph, a permutation, a name or a
//! verdict code). The bytes alone do not say which one the sender meant; the
//! receiver decides from the phase it is in, see [`Message::expect_control`]
//! and [`Message::expect_payload`].

use std::fmt;

use super::constants::*;

/// Control tokens of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlToken {
    /// Discovery request.
    Hello,
    /// Discovery reply.
    ServerAnswer,
    /// Peer-1 must generate candidates.
    NeedGraphs,
    /// Candidate upload begins.
    StartSendGraphs,
    /// Candidate upload ends.
    EndSendGraphs,
    /// Peer must commit to a move.
    NeedTurn,
    /// Peer must respond to a commitment.
    SendTurn,
    /// Replay: yes.
    PlayAgainTrue,
    /// Replay: no.
    PlayAgainFalse,
}

impl ControlToken {
    /// All tokens, in declaration order.
    pub const ALL: [ControlToken; 9] = [
        ControlToken::Hello,
        ControlToken::ServerAnswer,
        ControlToken::NeedGraphs,
        ControlToken::StartSendGraphs,
        ControlToken::EndSendGraphs,
        ControlToken::NeedTurn,
        ControlToken::SendTurn,
        ControlToken::PlayAgainTrue,
        ControlToken::PlayAgainFalse,
    ];

    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ControlToken::Hello => TOKEN_HELLO,
            ControlToken::ServerAnswer => TOKEN_SERVER_ANSWER,
            ControlToken::NeedGraphs => TOKEN_NEED_GRAPHS,
            ControlToken::StartSendGraphs => TOKEN_START_SEND_GRAPHS,
            ControlToken::EndSendGraphs => TOKEN_END_SEND_GRAPHS,
            ControlToken::NeedTurn => TOKEN_NEED_TURN,
            ControlToken::SendTurn => TOKEN_SEND_TURN,
            ControlToken::PlayAgainTrue => TOKEN_PLAY_AGAIN_TRUE,
            ControlToken::PlayAgainFalse => TOKEN_PLAY_AGAIN_FALSE,
        }
    }

    /// Wire bytes.
    pub fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    /// Parse a token from its exact wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_bytes() == bytes)
    }

    /// Replay answer token for a decision.
    pub fn replay(play_again: bool) -> Self {
        if play_again {
            ControlToken::PlayAgainTrue
        } else {
            ControlToken::PlayAgainFalse
        }
    }

    /// Interpret a replay answer token.
    pub fn as_replay(self) -> Option<bool> {
        match self {
            ControlToken::PlayAgainTrue => Some(true),
            ControlToken::PlayAgainFalse => Some(false),
            _ => None,
        }
    }
}

impl fmt::Display for ControlToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A framed message: either a control token or opaque payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// One of the protocol control tokens.
    Control(ControlToken),
    /// Opaque bytes (graph, permutation, name, verdict).
    Payload(Vec<u8>),
}

impl Message {
    /// Classify raw bytes; exact token matches become [`Message::Control`].
    pub fn classify(bytes: Vec<u8>) -> Self {
        match ControlToken::from_bytes(&bytes) {
            Some(token) => Message::Control(token),
            None => Message::Payload(bytes),
        }
    }

    /// Wire bytes of this message.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Control(token) => token.as_bytes(),
            Message::Payload(bytes) => bytes,
        }
    }

    /// Require a control token from `allowed`.
    pub fn expect_control(bytes: Vec<u8>, allowed: &[ControlToken]) -> Result<ControlToken, Self> {
        match Self::classify(bytes) {
            Message::Control(token) if allowed.contains(&token) => Ok(token),
            other => Err(other),
        }
    }

    /// Require opaque payload bytes; a control token here is out of phase.
    pub fn expect_payload(bytes: Vec<u8>) -> Result<Vec<u8>, Self> {
        match Self::classify(bytes) {
            Message::Payload(bytes) => Ok(bytes),
            other => Err(other),
        }
    }

    /// Short human-readable description for error reports.
    pub fn describe(&self) -> String {
        match self {
            Message::Control(token) => format!("control token {token}"),
            Message::Payload(bytes) => format!("{}-byte payload", bytes.len()),
        }
    }
}

impl From<ControlToken> for Message {
    fn from(token: ControlToken) -> Self {
        Message::Control(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_wire_strings() {
        assert_eq!(ControlToken::Hello.as_str(), "HELLO");
        assert_eq!(ControlToken::ServerAnswer.as_str(), "SERVER-ANSWER");
        assert_eq!(ControlToken::StartSendGraphs.as_str(), "START-SEND-GRAPHS");
        assert_eq!(ControlToken::PlayAgainFalse.as_str(), "PLAY-AGAIN-FALSE");
    }

    #[test]
    fn test_token_parse_is_exact() {
        for token in ControlToken::ALL {
            assert_eq!(ControlToken::from_bytes(token.as_bytes()), Some(token));
        }
        assert_eq!(ControlToken::from_bytes(b"hello"), None);
        assert_eq!(ControlToken::from_bytes(b"NEED-TURN "), None);
        assert_eq!(ControlToken::from_bytes(b""), None);
    }

    #[test]
    fn test_replay_tokens() {
        assert_eq!(ControlToken::replay(true), ControlToken::PlayAgainTrue);
        assert_eq!(ControlToken::replay(false).as_replay(), Some(false));
        assert_eq!(ControlToken::NeedTurn.as_replay(), None);
    }

    #[test]
    fn test_expect_control_rejects_payload() {
        let err = Message::expect_control(b"[[0,1]]".to_vec(), &[ControlToken::NeedTurn]);
        assert_eq!(err, Err(Message::Payload(b"[[0,1]]".to_vec())));

        let err = Message::expect_control(
            ControlToken::SendTurn.as_bytes().to_vec(),
            &[ControlToken::NeedTurn],
        );
        assert_eq!(err, Err(Message::Control(ControlToken::SendTurn)));
    }

    #[test]
    fn test_expect_payload_rejects_token() {
        let ok = Message::expect_payload(b"[1,0,2]".to_vec());
        assert_eq!(ok, Ok(b"[1,0,2]".to_vec()));

        let err = Message::expect_payload(b"END-SEND-GRAPHS".to_vec());
        assert_eq!(err, Err(Message::Control(ControlToken::EndSendGraphs)));
    }
}
