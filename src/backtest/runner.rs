use crate::execution::SymbolEngine;
use crate::models::{PriceUpdate, SignalType};
use crate::risk::TradingMode;
use crate::strategy::{score, ScorerConfig};

/// Settings for one replay run
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub symbol: String,
    pub mode: TradingMode,
    pub lot_size: f64,
    pub contract_multiplier: f64,
    pub timeframe_secs: i64,
    pub history_capacity: usize,
    /// Score every Nth finalized candle
    pub analyze_every: usize,
    pub scorer: ScorerConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            symbol: "XAUUSD".to_string(),
            mode: TradingMode::Scalping,
            lot_size: 1.0,
            contract_multiplier: 100.0,
            timeframe_secs: 60,
            history_capacity: 100,
            analyze_every: 5,
            scorer: ScorerConfig::default(),
        }
    }
}

/// Outcome summary of a replay
#[derive(Debug, Clone, Default)]
pub struct BacktestReport {
    pub ticks: usize,
    pub rejected_ticks: usize,
    pub candles: usize,
    pub signals_evaluated: usize,
    pub trades_opened: usize,
    pub trades_closed: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_profit: f64,
    pub max_drawdown: f64,
}

impl BacktestReport {
    pub fn win_rate(&self) -> f64 {
        if self.trades_closed == 0 {
            return 0.0;
        }
        self.wins as f64 / self.trades_closed as f64
    }
}

/// Replays a recorded or synthetic update stream through a [`SymbolEngine`].
///
/// Scoring uses the local scorer directly, so a replay is fully
/// deterministic: same updates, same config, same report.
pub struct ReplayRunner {
    config: BacktestConfig,
}

impl ReplayRunner {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, updates: &[PriceUpdate]) -> BacktestReport {
        let mut engine = SymbolEngine::new(
            self.config.symbol.clone(),
            self.config.timeframe_secs,
            self.config.history_capacity,
            self.config.mode,
            false,
            self.config.lot_size,
            self.config.contract_multiplier,
        );

        let cadence = self.config.analyze_every.max(1);
        let mut report = BacktestReport::default();
        let mut equity: f64 = 0.0;
        let mut peak_equity: f64 = 0.0;

        for update in updates {
            report.ticks += 1;
            let outcome = engine.on_update(update);

            if outcome.rejected {
                report.rejected_ticks += 1;
                continue;
            }

            report.trades_closed += outcome.closed.len();
            for id in &outcome.closed {
                let trade = engine.positions().get_trade(*id).expect("closed trade exists");
                if trade.profit >= 0.0 {
                    report.wins += 1;
                } else {
                    report.losses += 1;
                }
                equity += trade.profit;
                peak_equity = peak_equity.max(equity);
                report.max_drawdown = report.max_drawdown.max(peak_equity - equity);
            }

            if let (Some(_), Some(snapshot)) = (&outcome.finalized, &outcome.snapshot) {
                report.candles += 1;

                if report.candles % cadence == 0 {
                    let history = engine.history();
                    let last = history.last().expect("just finalized").clone();
                    let signal = score(snapshot, &last, &self.config.scorer);
                    report.signals_evaluated += 1;

                    if signal.signal != SignalType::Hold {
                        if let Ok(Some(_)) = engine.apply_signal(&signal) {
                            report.trades_opened += 1;
                        }
                    }
                }
            }
        }

        report.total_profit = engine.positions().total_profit();
        report
    }
}
