/// Incremental Relative Strength Index with Wilder smoothing.
///
/// Seeds the average gain/loss from the first `period` deltas, then smooths
/// with `avg = (avg * (period - 1) + x) / period`. `avg_loss == 0` maps to
/// RSI 100; output is always clamped to [0, 100].
#[derive(Debug, Clone)]
pub struct WilderRsi {
    period: usize,
    prev_close: Option<f64>,
    deltas_seen: usize,
    sum_gain: f64,
    sum_loss: f64,
    avg_gain: f64,
    avg_loss: f64,
    seeded: bool,
}

impl WilderRsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "RSI period must be non-zero");
        Self {
            period,
            prev_close: None,
            deltas_seen: 0,
            sum_gain: 0.0,
            sum_loss: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            seeded: false,
        }
    }

    /// Feed one close; returns the RSI once seeded, `None` during warm-up.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        let prev = match self.prev_close.replace(close) {
            Some(prev) => prev,
            None => return None,
        };

        let delta = close - prev;
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        if !self.seeded {
            self.sum_gain += gain;
            self.sum_loss += loss;
            self.deltas_seen += 1;
            if self.deltas_seen < self.period {
                return None;
            }
            self.avg_gain = self.sum_gain / self.period as f64;
            self.avg_loss = self.sum_loss / self.period as f64;
            self.seeded = true;
            return Some(self.current().expect("seeded"));
        }

        let n = self.period as f64;
        self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
        self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;

        Some(self.current().expect("seeded"))
    }

    /// Current RSI, `None` until the seed window is full.
    pub fn current(&self) -> Option<f64> {
        if !self.seeded {
            return None;
        }
        if self.avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = self.avg_gain / self.avg_loss;
        Some((100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0))
    }
}

/// RSI at each close from the seed point onward
pub fn calculate_rsi_series(closes: &[f64], period: usize) -> Vec<f64> {
    let mut state = WilderRsi::new(period);
    closes.iter().filter_map(|&c| state.update(c)).collect()
}

/// Latest RSI over the whole series, `None` below the warm-up length
pub fn calculate_rsi(closes: &[f64], period: usize) -> Option<f64> {
    calculate_rsi_series(closes, period).last().copied()
}
