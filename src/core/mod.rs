//! Core constants, message types, and error types (always included).

pub mod constants;
mod error;
mod message;

pub use error::*;
pub use message::*;
