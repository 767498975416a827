use crate::models::StochRsi;
use std::collections::VecDeque;

/// Incremental Stochastic RSI.
///
/// %K normalizes the latest RSI into its trailing `window`-value range,
/// special-cased to 0 when the window is flat (max == min). %D is a
/// `smoothing`-period simple average of %K; until enough %K values exist it
/// averages what is there.
#[derive(Debug, Clone)]
pub struct StochRsiState {
    window: usize,
    smoothing: usize,
    rsi_window: VecDeque<f64>,
    k_window: VecDeque<f64>,
}

impl StochRsiState {
    pub fn new(window: usize, smoothing: usize) -> Self {
        assert!(window > 0 && smoothing > 0, "stoch windows must be non-zero");
        Self {
            window,
            smoothing,
            rsi_window: VecDeque::with_capacity(window),
            k_window: VecDeque::with_capacity(smoothing),
        }
    }

    /// Feed one RSI value; returns %K/%D once the RSI window is full.
    pub fn update(&mut self, rsi: f64) -> Option<StochRsi> {
        if self.rsi_window.len() == self.window {
            self.rsi_window.pop_front();
        }
        self.rsi_window.push_back(rsi);

        if self.rsi_window.len() < self.window {
            return None;
        }

        let min = self.rsi_window.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = self.rsi_window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let k = if max == min {
            0.0
        } else {
            ((rsi - min) / (max - min) * 100.0).clamp(0.0, 100.0)
        };

        if self.k_window.len() == self.smoothing {
            self.k_window.pop_front();
        }
        self.k_window.push_back(k);

        let d = self.k_window.iter().sum::<f64>() / self.k_window.len() as f64;
        Some(StochRsi { k, d })
    }

    pub fn current(&self) -> Option<StochRsi> {
        let k = self.k_window.back().copied()?;
        let d = self.k_window.iter().sum::<f64>() / self.k_window.len() as f64;
        Some(StochRsi { k, d })
    }
}

impl Default for StochRsiState {
    fn default() -> Self {
        Self::new(14, 3)
    }
}

/// Latest Stochastic RSI(14, 3) over an RSI series, `None` below warm-up
pub fn calculate_stoch_rsi(rsi_series: &[f64]) -> Option<StochRsi> {
    let mut state = StochRsiState::default();
    rsi_series.iter().filter_map(|&r| state.update(r)).last()
}
