//! Numeric query request parser and response encoder.

use serde::{Deserialize, Serialize};

/// Method name accepted by the service.
pub const METHOD: &str = "isPrime";

/// Response line for malformed requests.
pub const INVALID: &[u8] = b"invalid";

/// A well-formed primality query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub number: f64,
    /// Client-side hint that the number is too large to test.
    pub big: bool,
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(default)]
    method: String,
    number: Option<f64>,
    #[serde(default)]
    bignumber: bool,
}

#[derive(Debug, Serialize)]
struct Response {
    method: &'static str,
    prime: bool,
}

/// Parse one request line.
///
/// Returns `None` for anything that is not a JSON object with
/// `"method": "isPrime"` and a numeric `number`.
pub fn parse(line: &[u8]) -> Option<Request> {
    let raw: RawRequest = serde_json::from_slice(line).ok()?;
    if raw.method != METHOD {
        return None;
    }
    Some(Request {
        number: raw.number?,
        big: raw.bignumber,
    })
}

/// Encode a response line (without delimiter).
pub fn encode_response(prime: bool) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&Response {
        method: METHOD,
        prime,
    })
}
