use crate::indicators::EmaState;
use crate::models::Macd;

/// Incremental MACD(12, 26, 9).
///
/// The MACD line is EMA12 - EMA26; the signal line is an EMA9 seeded from
/// the first nine MACD values (so it warms up only after the slow EMA has).
#[derive(Debug, Clone)]
pub struct MacdState {
    fast: EmaState,
    slow: EmaState,
    signal: EmaState,
}

impl MacdState {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast < slow, "fast period must be shorter than slow");
        Self {
            fast: EmaState::new(fast),
            slow: EmaState::new(slow),
            signal: EmaState::new(signal),
        }
    }

    /// Feed one close; returns MACD once line and signal are both seeded.
    pub fn update(&mut self, close: f64) -> Option<Macd> {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);

        let line = match (fast, slow) {
            (Some(fast), Some(slow)) => fast - slow,
            _ => return None,
        };

        let signal = self.signal.update(line)?;
        Some(Macd {
            macd: line,
            signal,
            histogram: line - signal,
        })
    }

    /// Current values, `None` until warmed up.
    pub fn current(&self) -> Option<Macd> {
        let line = self.fast.value()? - self.slow.value()?;
        let signal = self.signal.value()?;
        Some(Macd {
            macd: line,
            signal,
            histogram: line - signal,
        })
    }
}

impl Default for MacdState {
    fn default() -> Self {
        Self::new(12, 26, 9)
    }
}

/// Latest MACD(12, 26, 9) over the whole series, `None` below warm-up
pub fn calculate_macd(closes: &[f64]) -> Option<Macd> {
    let mut state = MacdState::default();
    closes.iter().filter_map(|&c| state.update(c)).last()
}
