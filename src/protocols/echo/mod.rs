//! Echo protocol implementation.
//!
//! The simplest service in the family, useful as a smoke test for the
//! dispatcher:
//! - Client sends: any bytes, in any chunking
//! - Server echoes: the identical bytes, in order
//!
//! ## Protocol Format
//!
//! There is no framing. Bytes are copied from the read half to the write
//! half as they arrive, so binary payloads pass through untouched. When the
//! client half-closes, the server finishes echoing and closes its side.
//!
//! ```text
//! Request:  \x00\x01hello\xff
//! Response: \x00\x01hello\xff
//! ```

pub mod handler;

pub use handler::handle_connection;
