//! Time-series averaging protocol implementation.
//!
//! Each connection keeps its own price history, built from fixed-size binary
//! messages:
//! - Client sends: 9-byte messages (`I` inserts, `Q` queries)
//! - Server responds: nothing for inserts, a 4-byte mean for queries
//!
//! ## Protocol Format
//!
//! ```text
//! Message:  <tag: u8> <arg1: i32 BE> <arg2: i32 BE>
//!
//! Insert:   'I' <timestamp> <price>
//! Query:    'Q' <mintime> <maxtime>
//! Response: <mean: i32 BE>
//! ```
//!
//! A query answers the mean of every price whose timestamp falls within
//! `mintime..=maxtime`, truncated toward zero, or 0 when there is none.
//! Inserting at an existing timestamp overwrites the previous price.
//! Messages with an unknown tag are ignored.

pub mod handler;
pub mod parser;

pub use handler::MeansHandler;
