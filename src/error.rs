//! Error types shared by the connection engine and the protocols.
//!
//! Errors fall into two scopes:
//! - Connection scoped (`FrameError`, `HandlerError`, `WorkerError`): they end
//!   one connection and are logged by the dispatcher.
//! - Listener scoped (`ServeError`): fatal to the whole process.

use std::io;
use thiserror::Error;

/// A frame could not be extracted from the stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The stream closed part way through a fixed-size frame.
    #[error("stream closed after {received} of {expected} frame bytes")]
    Truncated { expected: usize, received: usize },

    /// A delimited frame grew past the maximum length without a delimiter.
    #[error("frame exceeds {limit} bytes without a delimiter")]
    TooLong { limit: usize },
}

/// A protocol handler failed to produce a response.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A connection worker stopped abnormally.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    #[error("handler returned an error: {0}")]
    Handler(#[from] HandlerError),

    /// The writer half stopped before the reader finished queueing output.
    #[error("outbound queue closed")]
    OutboxClosed,
}

/// The listener can no longer accept connections.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to resolve listen address '{address}': {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to listen on '{address}': {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
}
