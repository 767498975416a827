use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{CloseReason, Trade, TradePhase, TradeSide};
use crate::risk::RiskParams;

/// Per-symbol owner of all trades and their stop-loss ratchets.
///
/// Every open trade carries its own state machine, evaluated on each price
/// tick in isolation from the others:
///
/// Risked -> Secured -> Closed
///
/// The stop only ever tightens: monotonically non-decreasing for Buy,
/// non-increasing for Sell, across the whole life of the trade. Once the
/// Secured transition has fired the trade cannot realize worse than
/// breakeven (gaps and slippage aside). Closed trades are immutable; the
/// trade log is append-only.
pub struct PositionManager {
    trades: Vec<Trade>,
    contract_multiplier: f64,
}

impl PositionManager {
    pub fn new(contract_multiplier: f64) -> Self {
        Self {
            trades: Vec::new(),
            contract_multiplier,
        }
    }

    /// Open a trade with risk parameters frozen from the active mode.
    pub fn open_trade(
        &mut self,
        side: TradeSide,
        entry_price: f64,
        lot_size: f64,
        params: &RiskParams,
    ) -> anyhow::Result<Uuid> {
        self.open_trade_at(side, entry_price, lot_size, params, None)
    }

    /// Open a trade with an explicit timestamp (for backtesting).
    pub fn open_trade_at(
        &mut self,
        side: TradeSide,
        entry_price: f64,
        lot_size: f64,
        params: &RiskParams,
        timestamp: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Uuid> {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            anyhow::bail!("Invalid entry price: {}", entry_price);
        }
        if !lot_size.is_finite() || lot_size <= 0.0 {
            anyhow::bail!("Invalid lot size: {}", lot_size);
        }

        let direction = side.direction();
        let initial_sl_price = entry_price - direction * params.stop_loss_points;
        let tp_price = params
            .take_profit_points
            .map(|points| entry_price + direction * points);

        let id = Uuid::new_v4();
        let trade = Trade {
            id,
            side,
            entry_price,
            lot_size,
            sl_price: initial_sl_price,
            initial_sl_price,
            tp_price,
            highest_favorable: entry_price,
            phase: TradePhase::Risked,
            exit_price: None,
            profit: 0.0,
            opened_at: timestamp.unwrap_or_else(Utc::now),
            closed_at: None,
            initial_risk_distance: (entry_price - initial_sl_price).abs(),
            breakeven_trigger_fraction: params.breakeven_trigger_fraction,
            trail_gap: params.trail_gap_points,
        };

        tracing::info!(
            trade = %id,
            ?side,
            entry = entry_price,
            sl = initial_sl_price,
            tp = ?tp_price,
            "trade opened"
        );

        self.trades.push(trade);
        Ok(id)
    }

    /// Ratchet every open trade against a new price.
    ///
    /// Non-finite prices are ignored (the aggregator filters them; this is
    /// the manager's own never-throws guarantee). Returns the ids of trades
    /// closed on this tick.
    pub fn on_price(&mut self, price: f64) -> Vec<Uuid> {
        self.on_price_at(price, None)
    }

    /// Ratchet with an explicit timestamp (for backtesting).
    pub fn on_price_at(&mut self, price: f64, timestamp: Option<DateTime<Utc>>) -> Vec<Uuid> {
        if !price.is_finite() {
            tracing::warn!(price, "ignoring non-finite price tick");
            return Vec::new();
        }

        let mut closed = Vec::new();
        let multiplier = self.contract_multiplier;

        for trade in self.trades.iter_mut().filter(|t| t.is_open()) {
            ratchet(trade, price);

            if let Some(reason) = evaluate_exit(trade, price) {
                // Exit at the crossed boundary, not the raw tick price
                let exit_price = match reason {
                    CloseReason::StopLoss => trade.sl_price,
                    CloseReason::TakeProfit => trade.tp_price.expect("tp exit requires tp"),
                };
                close(trade, exit_price, reason, multiplier, timestamp);
                closed.push(trade.id);
            }
        }

        closed
    }

    pub fn has_open_trade(&self) -> bool {
        self.trades.iter().any(|t| t.is_open())
    }

    pub fn open_trades(&self) -> Vec<&Trade> {
        self.trades.iter().filter(|t| t.is_open()).collect()
    }

    /// Full trade log, open and closed, in open order.
    pub fn all_trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn get_trade(&self, id: Uuid) -> Option<&Trade> {
        self.trades.iter().find(|t| t.id == id)
    }

    /// Realized profit over all closed trades.
    pub fn total_profit(&self) -> f64 {
        self.trades
            .iter()
            .filter(|t| !t.is_open())
            .map(|t| t.profit)
            .sum()
    }

    pub fn contract_multiplier(&self) -> f64 {
        self.contract_multiplier
    }
}

/// Advance one trade's ratchet for a new price. Close detection is separate
/// so the exit decision always sees the post-ratchet stop.
fn ratchet(trade: &mut Trade, price: f64) {
    // 1. Favorable excursion is monotonic by construction
    trade.highest_favorable = match trade.side {
        TradeSide::Buy => trade.highest_favorable.max(price),
        TradeSide::Sell => trade.highest_favorable.min(price),
    };

    // 2. Breakeven transition, fires at most once (phase makes re-firing
    //    unrepresentable)
    if trade.phase == TradePhase::Risked {
        let favorable_move = (price - trade.entry_price) * trade.side.direction();
        if favorable_move > trade.initial_risk_distance * trade.breakeven_trigger_fraction {
            trade.sl_price = trade.entry_price;
            trade.phase = TradePhase::Secured;
            tracing::info!(
                trade = %trade.id,
                sl = trade.sl_price,
                "stop moved to breakeven"
            );
        }
    }

    // 3. Trail while secured: only ever tighten
    if trade.phase == TradePhase::Secured {
        let candidate = match trade.side {
            TradeSide::Buy => trade.highest_favorable - trade.trail_gap,
            TradeSide::Sell => trade.highest_favorable + trade.trail_gap,
        };
        let tightens = match trade.side {
            TradeSide::Buy => candidate > trade.sl_price,
            TradeSide::Sell => candidate < trade.sl_price,
        };
        if tightens {
            trade.sl_price = candidate;
        }
    }
}

/// Exit decision for one tick. Adverse-first: when a tick would cross both
/// boundaries, the stop-loss wins.
fn evaluate_exit(trade: &Trade, price: f64) -> Option<CloseReason> {
    let stop_hit = match trade.side {
        TradeSide::Buy => price <= trade.sl_price,
        TradeSide::Sell => price >= trade.sl_price,
    };
    if stop_hit {
        return Some(CloseReason::StopLoss);
    }

    let tp_hit = trade.tp_price.is_some_and(|tp| match trade.side {
        TradeSide::Buy => price >= tp,
        TradeSide::Sell => price <= tp,
    });
    if tp_hit {
        return Some(CloseReason::TakeProfit);
    }

    None
}

fn close(
    trade: &mut Trade,
    exit_price: f64,
    reason: CloseReason,
    contract_multiplier: f64,
    timestamp: Option<DateTime<Utc>>,
) {
    trade.exit_price = Some(exit_price);
    trade.profit = (exit_price - trade.entry_price)
        * trade.side.direction()
        * trade.lot_size
        * contract_multiplier;
    trade.closed_at = Some(timestamp.unwrap_or_else(Utc::now));
    trade.phase = TradePhase::Closed(reason);

    tracing::info!(
        trade = %trade.id,
        ?reason,
        exit = exit_price,
        profit = trade.profit,
        "trade closed"
    );
}
