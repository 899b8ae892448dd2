//! Server-driven protocol state machine.
//!
//! The phase sequence and its transition table live here, independent of any
//! I/O. The relay's session task drives it over two framed connections; see
//! `server::RelaySession`.

mod error;
mod state;

pub use error::*;
pub use state::*;
