//! Relay side: session admission, the relay loop and the session driver.

mod relay;
mod session;
mod slots;

pub use relay::*;
pub use session::*;
pub use slots::*;
