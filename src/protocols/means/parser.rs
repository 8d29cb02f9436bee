//! Time-series message parser.

use bytes::Buf;

/// Size of every client message.
pub const MESSAGE_LEN: usize = 9;

/// Parsed client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Record `price` at `timestamp`.
    Insert { timestamp: i32, price: i32 },
    /// Ask for the mean price within `min_time..=max_time`.
    Query { min_time: i32, max_time: i32 },
}

/// Parse one message.
///
/// Returns `None` for short input or an unknown tag.
pub fn parse(frame: &[u8]) -> Option<Message> {
    if frame.len() < MESSAGE_LEN {
        return None;
    }

    let mut buf = &frame[..MESSAGE_LEN];
    let tag = buf.get_u8();
    let first = buf.get_i32();
    let second = buf.get_i32();

    match tag {
        b'I' => Some(Message::Insert {
            timestamp: first,
            price: second,
        }),
        b'Q' => Some(Message::Query {
            min_time: first,
            max_time: second,
        }),
        _ => None,
    }
}
