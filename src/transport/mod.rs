//! rps-graph transport layer.
//!
//! - **Framing**: [`write_frame`], [`read_frame`] and [`FramedConnection`],
//!   a 4-byte big-endian length followed by the payload, over any tokio
//!   stream.
//! - **Discovery**: [`discover`] and [`DiscoveryResponder`], the UDP
//!   `HELLO` / `SERVER-ANSWER` rendezvous.

mod discovery;
mod error;
mod framing;

pub use discovery::*;
pub use error::*;
pub use framing::*;
