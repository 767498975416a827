use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::market::CandleHistory;
use crate::models::{Candle, PriceUpdate};

#[derive(Debug, Error, PartialEq)]
pub enum FeedError {
    #[error("stale update for bucket {update_bucket}, current bucket is {current_bucket}")]
    StaleUpdate {
        update_bucket: DateTime<Utc>,
        current_bucket: DateTime<Utc>,
    },
    #[error("malformed update (non-finite price or negative volume)")]
    MalformedUpdate,
}

/// Folds a stream of price updates into fixed-interval OHLCV candles.
///
/// Owns the market state for exactly one symbol+timeframe: the forming
/// candle and the bounded history of finalized ones. Single writer; updates
/// are applied strictly in arrival order and stale ticks are rejected, not
/// reordered.
#[derive(Debug)]
pub struct CandleAggregator {
    timeframe_secs: i64,
    current: Option<Candle>,
    history: CandleHistory,
}

impl CandleAggregator {
    pub fn new(timeframe_secs: i64, capacity: usize) -> Self {
        assert!(timeframe_secs > 0, "timeframe must be positive");
        Self {
            timeframe_secs,
            current: None,
            history: CandleHistory::new(capacity),
        }
    }

    /// Floor a timestamp to the start of its bucket.
    pub fn bucket_start(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        let secs = timestamp.timestamp().div_euclid(self.timeframe_secs) * self.timeframe_secs;
        Utc.timestamp_opt(secs, 0).single().expect("valid bucket timestamp")
    }

    /// Apply one feed tick.
    ///
    /// Returns the finalized candle when the tick opens a new bucket, `None`
    /// when it merged into the forming one. Malformed and out-of-order ticks
    /// are rejected without touching any state.
    pub fn ingest(&mut self, update: &PriceUpdate) -> Result<Option<Candle>, FeedError> {
        if !update.is_well_formed() {
            return Err(FeedError::MalformedUpdate);
        }

        let bucket = self.bucket_start(update.timestamp);

        let current = match self.current.as_mut() {
            None => {
                self.current = Some(Self::seed_candle(bucket, update));
                return Ok(None);
            }
            Some(current) => current,
        };

        if bucket == current.bucket_start {
            // Same bucket: the update is a running snapshot of the forming
            // candle. Close and volume are replaced, the high/low envelope
            // only ever widens, open is fixed at seeding.
            current.close = update.close;
            current.high = current.high.max(update.high).max(update.close);
            current.low = current.low.min(update.low).min(update.close);
            current.volume = update.volume;
            return Ok(None);
        }

        if bucket < current.bucket_start {
            return Err(FeedError::StaleUpdate {
                update_bucket: bucket,
                current_bucket: current.bucket_start,
            });
        }

        // Newer bucket: finalize the forming candle and start the next one.
        let finalized = current.clone();
        self.history.push(finalized.clone());
        self.current = Some(Self::seed_candle(bucket, update));

        tracing::debug!(
            bucket = %finalized.bucket_start,
            close = finalized.close,
            "candle finalized"
        );

        Ok(Some(finalized))
    }

    /// Seed the forming candle, normalizing the envelope so the candle
    /// invariants hold even for a sloppy first snapshot.
    fn seed_candle(bucket_start: DateTime<Utc>, update: &PriceUpdate) -> Candle {
        let high = update.high.max(update.open).max(update.close);
        let low = update.low.min(update.open).min(update.close);
        Candle {
            bucket_start,
            open: update.open,
            high,
            low,
            close: update.close,
            volume: update.volume,
        }
    }

    /// Finalized candles, oldest first.
    pub fn history(&self) -> &CandleHistory {
        &self.history
    }

    /// The forming (unclosed) candle, if any.
    pub fn current(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    /// Close of the most recent tick, forming candle included.
    pub fn last_price(&self) -> Option<f64> {
        self.current
            .as_ref()
            .map(|c| c.close)
            .or_else(|| self.history.last().map(|c| c.close))
    }

    pub fn timeframe_secs(&self) -> i64 {
        self.timeframe_secs
    }
}
