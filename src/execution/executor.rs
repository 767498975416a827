use crate::models::{NewsImpact, Signal, SignalType, TradeSide};
use crate::risk::{required_confidence, TradingMode};

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionAction {
    Open { side: TradeSide },
    Skip,
}

#[derive(Debug, Clone)]
pub struct ExecutionDecision {
    pub action: ExecutionAction,
    pub reason: String,
}

/// Decides whether an incoming signal becomes a trade.
///
/// Pure gate logic: one open trade per symbol, the mode's confidence
/// threshold, and the high-impact-news floor. Actually opening the trade is
/// the symbol engine's job.
#[derive(Debug, Clone)]
pub struct Executor {
    mode: TradingMode,
    avoid_news: bool,
}

impl Executor {
    pub fn new(mode: TradingMode, avoid_news: bool) -> Self {
        Self { mode, avoid_news }
    }

    pub fn mode(&self) -> TradingMode {
        self.mode
    }

    pub fn decide(
        &self,
        signal: &Signal,
        news: NewsImpact,
        has_open_trade: bool,
    ) -> ExecutionDecision {
        let side = match signal.signal {
            SignalType::Buy => TradeSide::Buy,
            SignalType::Sell => TradeSide::Sell,
            SignalType::Hold => {
                return ExecutionDecision {
                    action: ExecutionAction::Skip,
                    reason: "Hold signal".to_string(),
                }
            }
        };

        if has_open_trade {
            return ExecutionDecision {
                action: ExecutionAction::Skip,
                reason: "Already have open trade".to_string(),
            };
        }

        let threshold = required_confidence(self.mode, self.avoid_news, news);
        if signal.confidence < threshold {
            let gated_by_news = self.avoid_news
                && news == NewsImpact::High
                && signal.confidence >= self.mode.risk_params().confidence_threshold;
            return ExecutionDecision {
                action: ExecutionAction::Skip,
                reason: if gated_by_news {
                    format!(
                        "Blocked by high-impact news: confidence {} < {}",
                        signal.confidence, threshold
                    )
                } else {
                    format!("Confidence {} below threshold {}", signal.confidence, threshold)
                },
            };
        }

        ExecutionDecision {
            action: ExecutionAction::Open { side },
            reason: format!(
                "{:?} signal at {}% (threshold {})",
                signal.signal, signal.confidence, threshold
            ),
        }
    }
}
