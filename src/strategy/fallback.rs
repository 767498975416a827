use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use crate::models::{Candle, IndicatorSnapshot, Signal};
use crate::strategy::{LocalHeuristicProvider, SignalProvider};
use crate::Result;

const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(6);

/// Races an optional remote provider against a timeout and falls back to
/// the local heuristic scorer.
///
/// The fallback path is total: whatever the remote does (timeout, quota,
/// network, garbage), `analyze` resolves with a signal and never `Err`.
pub struct FallbackProvider<R: SignalProvider> {
    remote: Option<R>,
    local: LocalHeuristicProvider,
    remote_timeout: Duration,
}

impl<R: SignalProvider> FallbackProvider<R> {
    pub fn new(remote: Option<R>, local: LocalHeuristicProvider) -> Self {
        Self {
            remote,
            local,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, remote_timeout: Duration) -> Self {
        self.remote_timeout = remote_timeout;
        self
    }

    /// Local-only provider, used when no remote endpoint is configured.
    pub fn local_only(local: LocalHeuristicProvider) -> Self {
        Self::new(None, local)
    }
}

#[async_trait]
impl<R: SignalProvider> SignalProvider for FallbackProvider<R> {
    async fn analyze(&self, snapshot: &IndicatorSnapshot, recent: &[Candle]) -> Result<Signal> {
        if let Some(remote) = &self.remote {
            match timeout(self.remote_timeout, remote.analyze(snapshot, recent)).await {
                Ok(Ok(signal)) => {
                    tracing::debug!(provider = remote.name(), "remote signal accepted");
                    return Ok(signal);
                }
                Ok(Err(err)) => {
                    tracing::warn!(
                        provider = remote.name(),
                        error = %err,
                        "remote provider failed, using local scorer"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        provider = remote.name(),
                        timeout_ms = self.remote_timeout.as_millis() as u64,
                        "remote provider timed out, using local scorer"
                    );
                }
            }
        }

        // The local path never fails
        self.local.analyze(snapshot, recent).await
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Macd, SignalType, StochRsi, Trend};
    use chrono::Utc;

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi: 50.0,
            ma50: 2350.0,
            ema20: 2350.0,
            ema50: 2350.0,
            macd: Macd {
                macd: 0.0,
                signal: 0.0,
                histogram: 0.0,
            },
            stoch_rsi: StochRsi { k: 50.0, d: 50.0 },
        }
    }

    fn candles() -> Vec<Candle> {
        vec![Candle {
            bucket_start: Utc::now(),
            open: 2350.0,
            high: 2351.0,
            low: 2349.0,
            close: 2350.0,
            volume: 100.0,
        }]
    }

    struct FailingRemote;

    #[async_trait]
    impl SignalProvider for FailingRemote {
        async fn analyze(&self, _: &IndicatorSnapshot, _: &[Candle]) -> Result<Signal> {
            Err("quota exhausted".into())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct HangingRemote;

    #[async_trait]
    impl SignalProvider for HangingRemote {
        async fn analyze(&self, _: &IndicatorSnapshot, _: &[Candle]) -> Result<Signal> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    struct FixedRemote;

    #[async_trait]
    impl SignalProvider for FixedRemote {
        async fn analyze(&self, _: &IndicatorSnapshot, _: &[Candle]) -> Result<Signal> {
            Ok(Signal {
                signal: SignalType::Sell,
                confidence: 91,
                trend: Trend::Down,
                support: 2340.0,
                resistance: 2360.0,
                suggested_sl: None,
                suggested_tp: None,
                reasoning: "remote verdict".to_string(),
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_remote_result_wins_when_healthy() {
        let provider = FallbackProvider::new(Some(FixedRemote), LocalHeuristicProvider::default());
        let signal = provider.analyze(&snapshot(), &candles()).await.unwrap();
        assert_eq!(signal.signal, SignalType::Sell);
        assert_eq!(signal.reasoning, "remote verdict");
    }

    #[tokio::test]
    async fn test_remote_error_falls_back_to_local() {
        let provider =
            FallbackProvider::new(Some(FailingRemote), LocalHeuristicProvider::default());
        let signal = provider.analyze(&snapshot(), &candles()).await.unwrap();
        // Neutral snapshot through the local scorer
        assert_eq!(signal.signal, SignalType::Hold);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_timeout_falls_back_to_local() {
        let provider = FallbackProvider::new(Some(HangingRemote), LocalHeuristicProvider::default())
            .with_timeout(Duration::from_millis(50));
        let signal = provider.analyze(&snapshot(), &candles()).await.unwrap();
        assert_eq!(signal.signal, SignalType::Hold);
    }

    #[tokio::test]
    async fn test_local_only_never_fails() {
        let provider: FallbackProvider<FailingRemote> =
            FallbackProvider::local_only(LocalHeuristicProvider::default());
        assert!(provider.analyze(&snapshot(), &candles()).await.is_ok());
        assert!(provider.analyze(&snapshot(), &[]).await.is_ok());
    }
}
