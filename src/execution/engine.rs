use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::execution::{ExecutionAction, Executor, PositionManager};
use crate::indicators::IndicatorEngine;
use crate::market::{CandleAggregator, FeedError};
use crate::models::{Candle, IndicatorSnapshot, NewsImpact, PriceUpdate, Signal};
use crate::risk::TradingMode;
use crate::strategy::SignalProvider;

/// What one feed tick did to the engine.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Candle finalized by this tick, if it rolled the bucket over
    pub finalized: Option<Candle>,
    /// Fresh snapshot, present exactly when a candle was finalized
    pub snapshot: Option<IndicatorSnapshot>,
    /// Trades closed by this tick's price
    pub closed: Vec<Uuid>,
    /// Tick was rejected by the aggregator (stale or malformed)
    pub rejected: bool,
}

/// Per-symbol reactive pipeline: aggregate -> indicators -> ratchet.
///
/// Owns all mutable state for one symbol (candle history, indicator state,
/// open trades) in a single execution context, which is what makes the
/// ratchet's monotonicity sound. Updates are processed strictly in arrival
/// order; each one triggers a bounded, synchronous chain and nothing here
/// blocks. Signal evaluation (which may call a remote model) lives in the
/// async driver [`run_engine`], never inside this chain.
pub struct SymbolEngine {
    symbol: String,
    aggregator: CandleAggregator,
    indicators: IndicatorEngine,
    positions: PositionManager,
    executor: Executor,
    lot_size: f64,
    news: NewsImpact,
}

impl SymbolEngine {
    pub fn new(
        symbol: impl Into<String>,
        timeframe_secs: i64,
        history_capacity: usize,
        mode: TradingMode,
        avoid_news: bool,
        lot_size: f64,
        contract_multiplier: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            aggregator: CandleAggregator::new(timeframe_secs, history_capacity),
            indicators: IndicatorEngine::new(),
            positions: PositionManager::new(contract_multiplier),
            executor: Executor::new(mode, avoid_news),
            lot_size,
            news: NewsImpact::None,
        }
    }

    /// Process one feed tick through the whole synchronous chain.
    pub fn on_update(&mut self, update: &PriceUpdate) -> TickOutcome {
        let finalized = match self.aggregator.ingest(update) {
            Ok(finalized) => finalized,
            Err(FeedError::MalformedUpdate) => {
                tracing::warn!(symbol = %self.symbol, "discarding malformed update");
                return TickOutcome {
                    rejected: true,
                    ..TickOutcome::default()
                };
            }
            Err(err @ FeedError::StaleUpdate { .. }) => {
                tracing::debug!(symbol = %self.symbol, %err, "discarding stale update");
                return TickOutcome {
                    rejected: true,
                    ..TickOutcome::default()
                };
            }
        };

        let snapshot = finalized.as_ref().map(|candle| {
            self.indicators.update(candle.close);
            self.indicators.snapshot()
        });

        // Ratchet every open trade on every accepted tick
        let closed = self.positions.on_price_at(update.close, Some(update.timestamp));

        TickOutcome {
            finalized,
            snapshot,
            closed,
            rejected: false,
        }
    }

    /// Latest news impact fed in by the environment; only the execution
    /// gate reads it.
    pub fn set_news(&mut self, news: NewsImpact) {
        self.news = news;
    }

    /// Run a signal through the execution gate, opening a trade when it
    /// passes. Returns the new trade id, if any.
    pub fn apply_signal(&mut self, signal: &Signal) -> anyhow::Result<Option<Uuid>> {
        let Some(price) = self.aggregator.last_price() else {
            return Ok(None);
        };

        let decision = self
            .executor
            .decide(signal, self.news, self.positions.has_open_trade());

        match decision.action {
            ExecutionAction::Open { side } => {
                let params = self.executor.mode().risk_params();
                let id = self
                    .positions
                    .open_trade(side, price, self.lot_size, &params)?;
                tracing::info!(symbol = %self.symbol, trade = %id, reason = %decision.reason, "signal executed");
                Ok(Some(id))
            }
            ExecutionAction::Skip => {
                tracing::debug!(symbol = %self.symbol, reason = %decision.reason, "signal skipped");
                Ok(None)
            }
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn history(&self) -> &crate::market::CandleHistory {
        self.aggregator.history()
    }

    pub fn snapshot(&self) -> IndicatorSnapshot {
        self.indicators.snapshot()
    }

    pub fn positions(&self) -> &PositionManager {
        &self.positions
    }

    pub fn last_price(&self) -> Option<f64> {
        self.aggregator.last_price()
    }
}

/// Drive a [`SymbolEngine`] from a feed channel until the channel closes or
/// shutdown is signalled.
///
/// Every `analyze_every`-th finalized candle is scored through the provider
/// (remote + fallback composition happens inside it) and the verdict runs
/// through the execution gate. Shutdown is idempotent: once the watch flips,
/// the loop drains nothing further and in-flight state is left consistent.
pub async fn run_engine(
    mut engine: SymbolEngine,
    provider: Arc<dyn SignalProvider>,
    mut feed: mpsc::Receiver<PriceUpdate>,
    mut shutdown: watch::Receiver<bool>,
    analyze_every: usize,
) -> SymbolEngine {
    let cadence = analyze_every.max(1);
    let mut candles_seen = 0usize;
    // Stops being polled once the shutdown handle is dropped unsignalled
    let mut shutdown_open = true;

    loop {
        let update = tokio::select! {
            changed = shutdown.changed(), if shutdown_open => {
                match changed {
                    Ok(()) if *shutdown.borrow() => {
                        tracing::info!(symbol = %engine.symbol, "engine shutdown requested");
                        break;
                    }
                    Ok(()) => continue,
                    Err(_) => {
                        shutdown_open = false;
                        continue;
                    }
                }
            }
            update = feed.recv() => match update {
                Some(update) => update,
                None => {
                    tracing::info!(symbol = %engine.symbol, "feed closed, stopping engine");
                    break;
                }
            },
        };

        let outcome = engine.on_update(&update);

        if outcome.finalized.is_some() {
            candles_seen += 1;

            if candles_seen % cadence == 0 {
                let snapshot = outcome.snapshot.expect("snapshot accompanies finalize");
                let recent = engine.history().recent(15);

                match provider.analyze(&snapshot, &recent).await {
                    Ok(signal) => {
                        if let Err(err) = engine.apply_signal(&signal) {
                            tracing::error!(symbol = %engine.symbol, %err, "failed to execute signal");
                        }
                    }
                    Err(err) => {
                        // Only possible without a fallback composition
                        tracing::warn!(symbol = %engine.symbol, %err, "signal provider failed");
                    }
                }
            }
        }
    }

    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{FallbackProvider, LocalHeuristicProvider, RemoteProvider};
    use chrono::{Duration, TimeZone, Utc};

    fn update(offset_secs: i64, close: f64) -> PriceUpdate {
        PriceUpdate {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
                + Duration::seconds(offset_secs),
            open: close,
            high: close + 0.3,
            low: close - 0.3,
            close,
            volume: 50.0,
        }
    }

    fn engine() -> SymbolEngine {
        SymbolEngine::new("XAUUSD", 60, 100, TradingMode::Scalping, false, 1.0, 100.0)
    }

    #[test]
    fn test_tick_chain_finalizes_and_snapshots_together() {
        let mut engine = engine();

        let outcome = engine.on_update(&update(0, 2350.0));
        assert!(outcome.finalized.is_none());
        assert!(outcome.snapshot.is_none());

        let outcome = engine.on_update(&update(61, 2351.0));
        assert!(outcome.finalized.is_some());
        assert!(outcome.snapshot.is_some());
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn test_rejected_tick_mutates_nothing() {
        let mut engine = engine();
        engine.on_update(&update(61, 2350.0));
        let history_len = engine.history().len();

        let outcome = engine.on_update(&update(0, 2349.0));
        assert!(outcome.rejected);
        assert_eq!(engine.history().len(), history_len);
        assert!(engine.positions().all_trades().is_empty());
    }

    #[test]
    fn test_every_tick_ratchets_open_trades() {
        let mut engine = engine();
        engine.on_update(&update(0, 2350.0));

        let signal = Signal {
            signal: crate::models::SignalType::Buy,
            confidence: 99,
            trend: crate::models::Trend::Up,
            support: 2345.0,
            resistance: 2355.0,
            suggested_sl: None,
            suggested_tp: None,
            reasoning: String::new(),
        };
        let id = engine.apply_signal(&signal).unwrap().unwrap();

        // Mid-bucket tick secures the trade (favorable 1.6 > 1.5)
        engine.on_update(&update(10, 2351.6));
        let trade = engine.positions().get_trade(id).unwrap();
        assert!(trade.is_secured());
        assert_eq!(trade.sl_price, 2350.0);
    }

    #[test]
    fn test_apply_signal_respects_gate() {
        let mut engine = engine();
        engine.on_update(&update(0, 2350.0));

        let weak = Signal {
            signal: crate::models::SignalType::Buy,
            confidence: 10,
            trend: crate::models::Trend::Up,
            support: 0.0,
            resistance: 0.0,
            suggested_sl: None,
            suggested_tp: None,
            reasoning: String::new(),
        };
        assert!(engine.apply_signal(&weak).unwrap().is_none());
        assert!(!engine.positions().has_open_trade());
    }

    #[test]
    fn test_apply_signal_without_prices_is_noop() {
        let mut engine = engine();
        let signal = Signal {
            signal: crate::models::SignalType::Buy,
            confidence: 99,
            trend: crate::models::Trend::Up,
            support: 0.0,
            resistance: 0.0,
            suggested_sl: None,
            suggested_tp: None,
            reasoning: String::new(),
        };
        assert!(engine.apply_signal(&signal).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_engine_processes_feed_and_stops_on_close() {
        let (tx, rx) = mpsc::channel(64);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let provider: Arc<dyn SignalProvider> = Arc::new(
            FallbackProvider::<RemoteProvider>::local_only(LocalHeuristicProvider::default()),
        );

        let handle = tokio::spawn(run_engine(engine(), provider, rx, shutdown_rx, 5));

        for i in 0..10 {
            tx.send(update(i * 60, 2350.0 + i as f64 * 0.1)).await.unwrap();
        }
        drop(tx);

        let engine = handle.await.unwrap();
        // 10 buckets seen, 9 finalized
        assert_eq!(engine.history().len(), 9);
    }

    #[tokio::test]
    async fn test_run_engine_shutdown_is_clean_and_idempotent() {
        let (tx, rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let provider: Arc<dyn SignalProvider> = Arc::new(
            FallbackProvider::<RemoteProvider>::local_only(LocalHeuristicProvider::default()),
        );

        let handle = tokio::spawn(run_engine(engine(), provider, rx, shutdown_rx, 5));

        tx.send(update(0, 2350.0)).await.unwrap();
        shutdown_tx.send(true).unwrap();
        // Second signal is harmless
        let _ = shutdown_tx.send(true);

        let engine = handle.await.unwrap();
        assert!(engine.history().len() <= 1);

        // Sending after shutdown never corrupts anything; the channel is
        // simply closed
        assert!(tx.send(update(60, 2351.0)).await.is_err() || engine.history().len() <= 1);
    }
}
