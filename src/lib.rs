//! # rps-graph
//!
//! Rock-Paper-Scissors between two peers that do not trust each other,
//! mediated by a relay that does not trust either of them.
//!
//! A peer never sends its move in the clear before seeing the opponent's.
//! Each game has three candidate graphs, one per move. The committing peer
//! sends a randomly relabeled copy of its candidate, the opponent answers
//! with its own candidate in the clear, and only then is the relabeling
//! revealed. Both peers compute the verdict locally; the relay only checks
//! that the two reports agree.
//!
//! ## Feature Flags
//!
//! - `transport` (default): framing and UDP discovery
//! - `server` (default): the relay and the `rps-relay` binary
//! - `client` (default): the player driver and relay bootstrap
//!
//! ## Modules
//!
//! - [`core`]: constants, wire messages and shared error types
//! - [`commitment`]: graphs, permutations, candidate sets and verdicts
//! - [`protocol`]: session phases and the transition table
//! - [`transport`]: length-prefixed framing and discovery (requires `transport`)
//! - [`server`]: pairing slots, relay and session driver (requires `server`)
//! - [`client`]: player driver and input seam (requires `client`)
//!
//! ## Example
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use rps_graph::commitment::{GenerationConfig, Move, generate_candidates};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let candidates = generate_candidates(&GenerationConfig::default(), &mut rng)?;
//!
//! // Commit to Paper, then open the commitment with the revealed permutation.
//! let sealed = candidates.seal(Move::Paper, &mut rng)?;
//! let opened = candidates.open(&sealed.commitment, &sealed.permutation)?;
//! assert_eq!(opened, Move::Paper);
//! # Ok::<(), rps_graph::RpsError>(())
//! ```
//!
//! Joining (or hosting) a game on the local network:
//!
//! ```no_run
//! use rps_graph::prelude::*;
//!
//! # async fn demo() -> Result<(), ClientError> {
//! let location = locate_or_host(&DiscoveryConfig::default(), RelayConfig::default()).await?;
//! let input = ScriptedInput::new("alice").moves([Move::Rock]);
//! let player = Player::connect(location.addr(), input, PlayerConfig::default()).await?;
//!
//! let summary = player.play_session().await?;
//! println!("{} wins against {}", summary.wins(), summary.opponent);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Commitment scheme (always included)
pub mod commitment;

// Protocol state machine (always included)
pub mod protocol;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Relay (feature-gated)
#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod server;

// Player (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commitment::*;
    pub use crate::core::*;
    pub use crate::protocol::*;

    #[cfg(feature = "transport")]
    pub use crate::transport::*;

    #[cfg(feature = "server")]
    pub use crate::server::*;

    #[cfg(feature = "client")]
    pub use crate::client::*;
}

// Re-export commonly used items at crate root
pub use crate::commitment::{CandidateSet, Graph, Move, Permutation, Verdict};
pub use crate::core::{CommitmentError, ControlToken, IntegrityError, Message, RpsError};
pub use crate::protocol::{Phase, ProtocolError};
