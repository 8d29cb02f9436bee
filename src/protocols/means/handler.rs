//! Time-series frame handler.

use super::parser::{self, Message};
use crate::error::HandlerError;
use crate::runtime::{FrameHandler, Reply};
use bytes::Bytes;
use std::collections::BTreeMap;
use tracing::trace;

/// Prices recorded on one connection, keyed by timestamp.
#[derive(Debug, Default)]
pub struct PriceHistory {
    prices: BTreeMap<i32, i32>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a price, replacing any price at the same timestamp.
    pub fn insert(&mut self, timestamp: i32, price: i32) {
        self.prices.insert(timestamp, price);
    }

    /// Mean price within `min_time..=max_time`, truncated toward zero.
    pub fn mean(&self, min_time: i32, max_time: i32) -> i32 {
        if min_time > max_time {
            return 0;
        }

        let (sum, count) = self
            .prices
            .range(min_time..=max_time)
            .fold((0i64, 0i64), |(sum, count), (_, &price)| {
                (sum + i64::from(price), count + 1)
            });

        if count == 0 {
            0
        } else {
            // The mean of i32 values always fits in an i32
            (sum / count) as i32
        }
    }
}

/// Per-connection handler owning a [`PriceHistory`].
#[derive(Debug, Default)]
pub struct MeansHandler {
    history: PriceHistory,
}

impl MeansHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameHandler for MeansHandler {
    fn handle(&mut self, frame: Bytes) -> Result<Reply, HandlerError> {
        match parser::parse(&frame) {
            Some(Message::Insert { timestamp, price }) => {
                self.history.insert(timestamp, price);
                Ok(Reply::Silent)
            }
            Some(Message::Query { min_time, max_time }) => {
                let mean = self.history.mean(min_time, max_time);
                trace!(min_time, max_time, mean, "Answered query");
                Ok(Reply::Frame(Bytes::copy_from_slice(&mean.to_be_bytes())))
            }
            None => {
                trace!(len = frame.len(), "Dropped message");
                Ok(Reply::Silent)
            }
        }
    }
}
