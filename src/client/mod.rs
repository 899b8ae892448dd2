//! Player side: decisions, the protocol driver, and relay bootstrap.

#[cfg(feature = "server")]
mod bootstrap;
mod input;
mod player;

#[cfg(feature = "server")]
pub use bootstrap::*;
pub use input::*;
pub use player::*;
