//! proto-servers: a family of small TCP protocol servers
//!
//! Every server runs on the same engine:
//! - A dispatcher that accepts connections and spawns one task per connection
//! - A connection worker that splits the stream into frames (line, word,
//!   byte or fixed-size) and feeds them to a protocol handler
//!
//! Protocols:
//! - Echo: raw bytes back to the sender
//! - Prime: JSON primality queries
//! - Means: per-connection price history and mean queries
//! - Chat: a shared chat room

pub mod config;
pub mod error;
pub mod protocols;
pub mod runtime;
pub mod server;
