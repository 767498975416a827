use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::PriceUpdate;

/// Market scenario types for synthetic feed generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FeedScenario {
    /// Steady climb with noise
    Uptrend,
    /// Steady decline with noise
    Downtrend,
    /// Mean-reverting chop around the base price
    Sideways,
    /// Large swings in both directions
    Volatile,
    /// Stable first half, sharp drop in the second
    FlashCrash,
}

/// Generates a seeded, reproducible stream of feed ticks.
///
/// Emits the same shape the live feed would: each update is a full snapshot
/// of the forming bucket (running open/high/low and cumulative volume), so
/// the aggregator's merge path gets exercised, not just its rollover path.
pub struct SyntheticFeed {
    rng: StdRng,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticFeed {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 2350.0,
            base_volume: 500.0,
        }
    }

    pub fn with_base_price(mut self, base_price: f64) -> Self {
        self.base_price = base_price;
        self
    }

    /// Generate `num_ticks` updates, `ticks_per_bucket` to a bucket.
    pub fn generate(
        &mut self,
        scenario: FeedScenario,
        num_ticks: usize,
        timeframe_secs: i64,
        ticks_per_bucket: usize,
    ) -> Vec<PriceUpdate> {
        assert!(ticks_per_bucket > 0, "need at least one tick per bucket");

        let tick_secs = (timeframe_secs / ticks_per_bucket as i64).max(1);
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();

        let mut updates = Vec::with_capacity(num_ticks);
        let mut price = self.base_price;
        let mut bucket = BucketState::seed(price);

        for i in 0..num_ticks {
            price = self.next_price(scenario, price, i, num_ticks);
            let timestamp = start + Duration::seconds(i as i64 * tick_secs);

            if i > 0 && i % ticks_per_bucket == 0 {
                bucket = BucketState::seed(price);
            }
            let volume_delta = self.base_volume * self.rng.gen_range(0.05..0.3);
            bucket.absorb(price, volume_delta);

            updates.push(bucket.snapshot(timestamp));
        }

        updates
    }

    fn next_price(
        &mut self,
        scenario: FeedScenario,
        price: f64,
        index: usize,
        total: usize,
    ) -> f64 {
        let next = match scenario {
            FeedScenario::Uptrend => {
                price * (1.0 + 0.0004) + price * self.rng.gen_range(-0.0005..0.0005)
            }
            FeedScenario::Downtrend => {
                price * (1.0 - 0.0004) + price * self.rng.gen_range(-0.0005..0.0005)
            }
            FeedScenario::Sideways => {
                let reversion = (self.base_price - price) * 0.05;
                price + reversion + price * self.rng.gen_range(-0.001..0.001)
            }
            FeedScenario::Volatile => price + price * self.rng.gen_range(-0.004..0.004),
            FeedScenario::FlashCrash => {
                if index < total / 2 {
                    price + price * self.rng.gen_range(-0.0005..0.0008)
                } else {
                    // Sharp decline over the second half
                    let drop_rate = 0.10 / (total as f64 / 2.0);
                    price * (1.0 - drop_rate) + price * self.rng.gen_range(-0.0005..0.0005)
                }
            }
        };

        // Keep the walk away from zero
        next.max(self.base_price * 0.3)
    }
}

/// Running state of the forming bucket, mirrored into each emitted update
struct BucketState {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl BucketState {
    fn seed(price: f64) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
        }
    }

    fn absorb(&mut self, price: f64, volume_delta: f64) {
        self.close = price;
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.volume += volume_delta;
    }

    fn snapshot(&self, timestamp: DateTime<Utc>) -> PriceUpdate {
        PriceUpdate {
            timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptrend_ends_higher() {
        let mut feed = SyntheticFeed::new(42);
        let updates = feed.generate(FeedScenario::Uptrend, 1000, 60, 4);

        assert_eq!(updates.len(), 1000);
        assert!(updates.last().unwrap().close > updates.first().unwrap().close);
    }

    #[test]
    fn test_downtrend_ends_lower() {
        let mut feed = SyntheticFeed::new(42);
        let updates = feed.generate(FeedScenario::Downtrend, 1000, 60, 4);
        assert!(updates.last().unwrap().close < updates.first().unwrap().close);
    }

    #[test]
    fn test_sideways_stays_near_base() {
        let mut feed = SyntheticFeed::new(42);
        let updates = feed.generate(FeedScenario::Sideways, 1000, 60, 4);
        for update in &updates {
            assert!(update.close > 2350.0 * 0.9 && update.close < 2350.0 * 1.1);
        }
    }

    #[test]
    fn test_flash_crash_drops_in_second_half() {
        let mut feed = SyntheticFeed::new(7);
        let updates = feed.generate(FeedScenario::FlashCrash, 1000, 60, 4);

        let mid = updates[updates.len() / 2 - 1].close;
        let last = updates.last().unwrap().close;
        assert!(last < mid * 0.95, "expected crash: {} -> {}", mid, last);
    }

    #[test]
    fn test_updates_are_well_formed_and_ordered() {
        let mut feed = SyntheticFeed::new(11);
        let updates = feed.generate(FeedScenario::Volatile, 500, 60, 4);

        for window in updates.windows(2) {
            assert!(window[1].timestamp > window[0].timestamp);
        }
        for update in &updates {
            assert!(update.is_well_formed());
            assert!(update.high >= update.open.max(update.close));
            assert!(update.low <= update.open.min(update.close));
        }
    }

    #[test]
    fn test_same_seed_reproduces_stream() {
        let a = SyntheticFeed::new(99).generate(FeedScenario::Volatile, 200, 60, 4);
        let b = SyntheticFeed::new(99).generate(FeedScenario::Volatile, 200, 60, 4);

        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.close, y.close);
            assert_eq!(x.volume, y.volume);
        }
    }

    #[test]
    fn test_volume_accumulates_within_bucket() {
        let mut feed = SyntheticFeed::new(3);
        let updates = feed.generate(FeedScenario::Sideways, 8, 60, 4);

        // Within a bucket the reported (cumulative) volume grows
        assert!(updates[1].volume > updates[0].volume);
        assert!(updates[3].volume > updates[2].volume);
        // A new bucket reseeds: its first tick has a degenerate envelope
        assert_eq!(updates[4].open, updates[4].close);
        assert_eq!(updates[4].high, updates[4].low);
    }
}
