//! Protocol implementations.
//!
//! Each protocol plugs into the connection engine in `runtime`.
//!
//! ## Stateless Protocols
//! - `echo`: raw byte echo, no framing
//! - `prime`: line-delimited JSON primality queries
//!
//! ## Stateful Protocols
//! - `means`: per-connection price history over fixed-size binary messages
//! - `chat`: line-based chat room shared by all connections

pub mod chat;
pub mod echo;
pub mod means;
pub mod prime;
