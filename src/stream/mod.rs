//! Streaming audio state
//!
//! - Rolling accumulator that turns small chunks into full windows
//! - Session registry giving every stream its own accumulator

pub mod accumulator;
pub mod session;

pub use accumulator::{PushOutcome, StreamAccumulator};
pub use session::{SessionHandle, SessionRegistry};
