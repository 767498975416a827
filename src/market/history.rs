use crate::models::Candle;
use std::collections::VecDeque;

/// Bounded, ordered window of finalized candles.
///
/// Insertion order is time order; the oldest candle is evicted when the
/// window is full, so memory stays O(capacity) for any stream length.
/// Owned exclusively by the aggregator of one symbol; everyone else gets
/// read-only views.
#[derive(Debug, Clone)]
pub struct CandleHistory {
    candles: VecDeque<Candle>,
    capacity: usize,
}

impl CandleHistory {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be non-zero");
        Self {
            candles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a finalized candle, evicting the oldest at capacity.
    pub fn push(&mut self, candle: Candle) {
        if self.candles.len() == self.capacity {
            self.candles.pop_front();
        }
        self.candles.push_back(candle);
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    /// Close series in time order, the input to every indicator.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// The most recent `n` candles, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Candle> {
        self.candles
            .iter()
            .rev()
            .take(n)
            .rev()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn candle(close: f64, minutes: i64) -> Candle {
        Candle {
            bucket_start: Utc::now() + Duration::minutes(minutes),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn test_push_and_order() {
        let mut history = CandleHistory::new(10);
        history.push(candle(1.0, 0));
        history.push(candle(2.0, 1));
        history.push(candle(3.0, 2));

        assert_eq!(history.len(), 3);
        assert_eq!(history.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(history.last().unwrap().close, 3.0);
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let mut history = CandleHistory::new(3);
        for i in 0..5 {
            history.push(candle(i as f64, i));
        }

        // Oldest two evicted, order preserved
        assert_eq!(history.len(), 3);
        assert_eq!(history.closes(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let mut history = CandleHistory::new(10);
        for i in 0..6 {
            history.push(candle(i as f64, i));
        }

        let recent = history.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].close, 3.0);
        assert_eq!(recent[2].close, 5.0);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_rejected() {
        CandleHistory::new(0);
    }
}
