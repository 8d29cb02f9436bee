//! Numeric query frame handler.

use super::parser::{self, INVALID};
use crate::error::HandlerError;
use crate::runtime::{FrameHandler, Reply};
use bytes::Bytes;
use tracing::trace;

/// Every f64 at or above 2^53 is an even integer.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Stateless handler for primality queries.
#[derive(Debug, Default)]
pub struct PrimeHandler;

impl PrimeHandler {
    pub fn new() -> Self {
        Self
    }
}

impl FrameHandler for PrimeHandler {
    fn handle(&mut self, frame: Bytes) -> Result<Reply, HandlerError> {
        let Some(request) = parser::parse(&frame) else {
            trace!("Malformed request");
            return Ok(Reply::Frame(Bytes::from_static(INVALID)));
        };

        let prime = !request.big && number_is_prime(request.number);
        trace!(number = request.number, prime, "Answered query");

        Ok(Reply::Frame(Bytes::from(parser::encode_response(prime)?)))
    }
}

/// Primality of a JSON number; non-integers are never prime.
pub fn number_is_prime(number: f64) -> bool {
    if !number.is_finite() || number.fract() != 0.0 || number < 2.0 {
        return false;
    }
    if number >= EXACT_INTEGER_LIMIT {
        return false;
    }
    is_prime(number as u64)
}

/// Deterministic trial division over 6k ± 1 candidates.
pub fn is_prime(n: u64) -> bool {
    if n == 2 || n == 3 {
        return true;
    }
    if n <= 1 || n % 2 == 0 || n % 3 == 0 {
        return false;
    }

    let mut i = 5;
    while i <= n / i {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}
