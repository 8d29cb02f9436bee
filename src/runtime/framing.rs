//! Framing strategies for splitting a byte stream into frames.
//!
//! A [`Decoder`] works over the connection's read buffer: it either carves
//! one complete frame off the front of the buffer or asks for more data.
//! The `eof` flag tells it that no more data will arrive, which lets
//! delimited strategies emit a final unterminated frame and lets fixed-size
//! framing detect truncation.

use crate::error::FrameError;
use bytes::{Buf, Bytes, BytesMut};

/// Longest line or word accepted before a delimiter is seen.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

/// Boundary rule used to split a stream into frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Bytes up to (not including) `\n`; a trailing `\r` is dropped.
    Line,
    /// Maximal run of non-whitespace bytes.
    Word,
    /// Exactly one byte.
    Byte,
    /// Exactly `n` bytes.
    Fixed(usize),
}

impl Framing {
    /// Bytes written after every response frame.
    pub fn delimiter(self) -> &'static [u8] {
        match self {
            Framing::Line => b"\n",
            Framing::Word => b" ",
            Framing::Byte | Framing::Fixed(_) => b"",
        }
    }
}

/// Frame extractor for one connection.
///
/// Remembers how far the last delimiter search got, so each byte of a
/// pending line or word is scanned once however many reads it arrives in.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    framing: Framing,
    next_index: usize,
}

impl Decoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            next_index: 0,
        }
    }

    /// Extract the next frame from `buffer`.
    ///
    /// Returns `Ok(None)` when more data is needed, or when `eof` is set and
    /// nothing but delimiters remains. Between calls the buffer may only
    /// grow at the back.
    pub fn decode(&mut self, buffer: &mut BytesMut, eof: bool) -> Result<Option<Bytes>, FrameError> {
        match self.framing {
            Framing::Line => self.decode_line(buffer, eof),
            Framing::Word => self.decode_word(buffer, eof),
            Framing::Byte => decode_fixed(buffer, 1, eof),
            Framing::Fixed(len) => decode_fixed(buffer, len, eof),
        }
    }

    fn decode_line(&mut self, buffer: &mut BytesMut, eof: bool) -> Result<Option<Bytes>, FrameError> {
        if let Some(pos) = self.find(buffer, |b| b == b'\n') {
            self.next_index = 0;
            if pos > MAX_FRAME_LENGTH {
                return Err(FrameError::TooLong {
                    limit: MAX_FRAME_LENGTH,
                });
            }
            let mut line = buffer.split_to(pos + 1);
            line.truncate(pos);
            return Ok(Some(strip_cr(line)));
        }

        if buffer.len() > MAX_FRAME_LENGTH {
            return Err(FrameError::TooLong {
                limit: MAX_FRAME_LENGTH,
            });
        }

        if eof && !buffer.is_empty() {
            self.next_index = 0;
            return Ok(Some(strip_cr(buffer.split())));
        }

        self.next_index = buffer.len();
        Ok(None)
    }

    fn decode_word(&mut self, buffer: &mut BytesMut, eof: bool) -> Result<Option<Bytes>, FrameError> {
        // Leading whitespace is never part of a frame, drop it eagerly
        if self.next_index == 0 {
            match buffer.iter().position(|&b| !is_space(b)) {
                Some(start) => buffer.advance(start),
                None => {
                    buffer.clear();
                    return Ok(None);
                }
            }
        }

        if let Some(end) = self.find(buffer, is_space) {
            self.next_index = 0;
            if end > MAX_FRAME_LENGTH {
                return Err(FrameError::TooLong {
                    limit: MAX_FRAME_LENGTH,
                });
            }
            let word = buffer.split_to(end).freeze();
            buffer.advance(1);
            return Ok(Some(word));
        }

        if buffer.len() > MAX_FRAME_LENGTH {
            return Err(FrameError::TooLong {
                limit: MAX_FRAME_LENGTH,
            });
        }

        if eof {
            self.next_index = 0;
            return Ok(Some(buffer.split().freeze()));
        }

        self.next_index = buffer.len();
        Ok(None)
    }

    /// Position of the first delimiter at or after `next_index`.
    fn find(&self, buffer: &[u8], is_delimiter: impl Fn(u8) -> bool) -> Option<usize> {
        buffer
            .get(self.next_index..)?
            .iter()
            .position(|&b| is_delimiter(b))
            .map(|offset| self.next_index + offset)
    }
}

fn strip_cr(mut line: BytesMut) -> Bytes {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line.freeze()
}

fn decode_fixed(buffer: &mut BytesMut, len: usize, eof: bool) -> Result<Option<Bytes>, FrameError> {
    // A zero-length frame carries nothing; never produce one
    if len == 0 {
        return Ok(None);
    }

    if buffer.len() >= len {
        return Ok(Some(buffer.split_to(len).freeze()));
    }

    if eof && !buffer.is_empty() {
        return Err(FrameError::Truncated {
            expected: len,
            received: buffer.len(),
        });
    }

    Ok(None)
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}
