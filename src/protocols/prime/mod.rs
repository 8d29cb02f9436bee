//! Numeric query protocol implementation.
//!
//! A stateless line-delimited JSON service that answers primality queries:
//! - Client sends: `{"method":"isPrime","number":7}\n`
//! - Server responds: `{"method":"isPrime","prime":true}\n`
//!
//! ## Protocol Format
//!
//! ```text
//! Request:  {"method":"isPrime","number":7}
//! Response: {"method":"isPrime","prime":true}
//!
//! Request:  {"method":"isPrime","number":123456789012345678901234567890,"bignumber":true}
//! Response: {"method":"isPrime","prime":false}
//!
//! Request:  {"method":"isEven","number":2}
//! Response: invalid
//! ```
//!
//! A malformed request gets the literal `invalid` line and the connection
//! stays open. Requests flagged `bignumber` are always answered `false`
//! without testing, as are non-integer numbers.

pub mod handler;
pub mod parser;

pub use handler::PrimeHandler;
