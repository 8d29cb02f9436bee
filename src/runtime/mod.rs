//! Connection engine shared by every protocol.
//!
//! - `framing`: strategies that split a byte stream into frames
//! - `connection`: the per-connection worker driving a `FrameHandler`

pub mod connection;
pub mod framing;

pub use connection::{run_framed, FrameHandler, Outbox, Reply};
pub use framing::{Decoder, Framing, MAX_FRAME_LENGTH};
