use std::collections::VecDeque;

use crate::indicators::{EmaState, MacdState, StochRsiState, WilderRsi};
use crate::market::CandleHistory;
use crate::models::{IndicatorSnapshot, Macd, StochRsi};

const RSI_PERIOD: usize = 14;
const STOCH_WINDOW: usize = 14;
const STOCH_SMOOTHING: usize = 3;
const MA_PERIOD: usize = 50;

/// Computes the full indicator snapshot from the candle close series.
///
/// Carries incremental state (Wilder averages, running EMAs, rolling RSI and
/// %K windows) so each new close is O(1) instead of a full history rescan.
/// [`IndicatorEngine::compute`] rebuilds from scratch and is the pure,
/// idempotent reference path; the incremental and recomputed snapshots are
/// identical for the same close series.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    last_close: Option<f64>,
    rsi: WilderRsi,
    stoch: StochRsiState,
    ma_window: VecDeque<f64>,
    ema20: EmaState,
    ema50: EmaState,
    macd: MacdState,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self {
            last_close: None,
            rsi: WilderRsi::new(RSI_PERIOD),
            stoch: StochRsiState::new(STOCH_WINDOW, STOCH_SMOOTHING),
            ma_window: VecDeque::with_capacity(MA_PERIOD),
            ema20: EmaState::new(20),
            ema50: EmaState::new(50),
            macd: MacdState::default(),
        }
    }

    /// Incorporate one finalized close.
    pub fn update(&mut self, close: f64) {
        self.last_close = Some(close);

        if let Some(rsi) = self.rsi.update(close) {
            self.stoch.update(rsi);
        }

        if self.ma_window.len() == MA_PERIOD {
            self.ma_window.pop_front();
        }
        self.ma_window.push_back(close);

        self.ema20.update(close);
        self.ema50.update(close);
        self.macd.update(close);
    }

    /// Current snapshot, complete by construction.
    ///
    /// Warm-up defaults per indicator: RSI 50, StochRSI {50, 50}, EMAs and
    /// MA50 the last close (0 before any data), MACD all zeros. A consumer
    /// never sees a partial snapshot.
    pub fn snapshot(&self) -> IndicatorSnapshot {
        let fallback_price = self.last_close.unwrap_or(0.0);

        let ma50 = if self.ma_window.len() == MA_PERIOD {
            self.ma_window.iter().sum::<f64>() / MA_PERIOD as f64
        } else {
            fallback_price
        };

        IndicatorSnapshot {
            rsi: self.rsi.current().unwrap_or(50.0),
            ma50,
            ema20: self.ema20.value().unwrap_or(fallback_price),
            ema50: self.ema50.value().unwrap_or(fallback_price),
            macd: self.macd.current().unwrap_or(Macd {
                macd: 0.0,
                signal: 0.0,
                histogram: 0.0,
            }),
            stoch_rsi: self.stoch.current().unwrap_or(StochRsi { k: 50.0, d: 50.0 }),
        }
    }

    /// Recompute the snapshot from a history, stateless and idempotent.
    pub fn compute(history: &CandleHistory) -> IndicatorSnapshot {
        let mut engine = Self::new();
        for candle in history.iter() {
            engine.update(candle.close);
        }
        engine.snapshot()
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}
