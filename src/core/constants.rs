//! Protocol constants.
//!
//! Wire tokens are fixed by the protocol and MUST NOT be changed; the
//! remaining values are defaults that configuration may override.

use std::time::Duration;

// =============================================================================
// CONTROL TOKENS
// =============================================================================

/// Discovery request broadcast by a client looking for a relay.
pub const TOKEN_HELLO: &str = "HELLO";

/// Discovery reply sent by a relay.
pub const TOKEN_SERVER_ANSWER: &str = "SERVER-ANSWER";

/// Relay asks peer-1 to generate and upload the candidate graphs.
pub const TOKEN_NEED_GRAPHS: &str = "NEED-GRAPHS";

/// Opens the bracketed candidate upload to peer-2.
pub const TOKEN_START_SEND_GRAPHS: &str = "START-SEND-GRAPHS";

/// Closes the bracketed candidate upload to peer-2.
pub const TOKEN_END_SEND_GRAPHS: &str = "END-SEND-GRAPHS";

/// Relay asks the acting peer for a commitment.
pub const TOKEN_NEED_TURN: &str = "NEED-TURN";

/// Relay tells the responding peer a commitment is on its way.
pub const TOKEN_SEND_TURN: &str = "SEND-TURN";

/// Replay answer: play another game.
pub const TOKEN_PLAY_AGAIN_TRUE: &str = "PLAY-AGAIN-TRUE";

/// Replay answer: stop.
pub const TOKEN_PLAY_AGAIN_FALSE: &str = "PLAY-AGAIN-FALSE";

// =============================================================================
// FRAMING
// =============================================================================

/// Size of the big-endian length prefix in front of every payload.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Default cap applied by relay and player connections to incoming payloads.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

// =============================================================================
// DISCOVERY
// =============================================================================

/// How long a client waits for a discovery reply.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Receive buffer for discovery datagrams.
pub const DISCOVERY_BUFFER_SIZE: usize = 1024;

/// Default port shared by the relay's TCP listener and discovery socket.
pub const DEFAULT_RELAY_PORT: u16 = 50007;

/// How long the relay waits on a silent peer-1 when checking it is still
/// connected before pairing.
pub const HANGUP_CHECK_TIMEOUT: Duration = Duration::from_millis(10);

// =============================================================================
// COMMITMENT SCHEME
// =============================================================================

/// Number of candidate graphs per game (Rock, Paper, Scissor).
pub const CANDIDATE_COUNT: usize = 3;

/// Default vertex count of a candidate graph.
pub const DEFAULT_VERTICES: u32 = 10;

/// Default uniform degree of a candidate graph.
pub const DEFAULT_DEGREE: u32 = 2;

/// Default cap on regular-graph construction restarts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;
