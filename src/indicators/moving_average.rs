/// Calculate Simple Moving Average over the most recent `period` values
pub fn calculate_sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let sum: f64 = values.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Incremental Exponential Moving Average.
///
/// Seeds with the simple average of the first `period` values, then applies
/// the recurrence `ema = (x - ema) * k + ema` with `k = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct EmaState {
    period: usize,
    multiplier: f64,
    seed: Vec<f64>,
    value: Option<f64>,
}

impl EmaState {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be non-zero");
        Self {
            period,
            multiplier: 2.0 / (period as f64 + 1.0),
            seed: Vec::with_capacity(period),
            value: None,
        }
    }

    /// Feed one value; returns the EMA once seeded, `None` during warm-up.
    pub fn update(&mut self, x: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                let next = (x - prev) * self.multiplier + prev;
                self.value = Some(next);
                Some(next)
            }
            None => {
                self.seed.push(x);
                if self.seed.len() == self.period {
                    let sma = self.seed.iter().sum::<f64>() / self.period as f64;
                    self.value = Some(sma);
                    Some(sma)
                } else {
                    None
                }
            }
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

/// EMA value at each index from the seed point onward.
///
/// The returned series starts at index `period - 1` of the input; earlier
/// indices have no EMA. Empty when the input is shorter than `period`.
pub fn calculate_ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut state = EmaState::new(period);
    values.iter().filter_map(|&x| state.update(x)).collect()
}

/// Latest EMA over the whole series, `None` below the warm-up length
pub fn calculate_ema(values: &[f64], period: usize) -> Option<f64> {
    calculate_ema_series(values, period).last().copied()
}
