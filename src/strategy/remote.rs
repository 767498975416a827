use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::{Candle, IndicatorSnapshot, Signal, SignalType, Trend};
use crate::strategy::SignalProvider;
use crate::Result;

const RECENT_CANDLES_SENT: usize = 15;

/// Signal source backed by a remote model endpoint.
///
/// POSTs a compact market summary and expects a JSON verdict back. Failures
/// (network, quota, malformed response) surface as errors; the caller is
/// expected to wrap this in a [`crate::strategy::FallbackProvider`] rather
/// than retry a stale market picture.
#[derive(Clone)]
pub struct RemoteProvider {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    rsi: f64,
    ema20: f64,
    ema50: f64,
    macd_histogram: f64,
    stoch_k: f64,
    candles: Vec<CandlePoint>,
    #[serde(skip_serializing_if = "str::is_empty")]
    api_key: &'a str,
}

#[derive(Debug, Serialize)]
struct CandlePoint {
    close: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    signal: String,
    confidence: u8,
    #[serde(default)]
    trend: Option<String>,
    support: f64,
    resistance: f64,
    reasoning: String,
}

impl RemoteProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    fn to_signal(&self, response: AnalyzeResponse) -> Signal {
        // Unknown verdict strings degrade to Hold rather than erroring out
        let signal = match response.signal.as_str() {
            "BUY" => SignalType::Buy,
            "SELL" => SignalType::Sell,
            _ => SignalType::Hold,
        };
        let trend = match response.trend.as_deref() {
            Some("UP") => Trend::Up,
            Some("DOWN") => Trend::Down,
            _ => Trend::Sideways,
        };

        Signal {
            signal,
            confidence: response.confidence.min(99),
            trend,
            support: response.support,
            resistance: response.resistance,
            suggested_sl: None,
            suggested_tp: None,
            reasoning: response.reasoning,
        }
    }
}

#[async_trait]
impl SignalProvider for RemoteProvider {
    async fn analyze(&self, snapshot: &IndicatorSnapshot, recent: &[Candle]) -> Result<Signal> {
        let tail_start = recent.len().saturating_sub(RECENT_CANDLES_SENT);
        let request = AnalyzeRequest {
            rsi: snapshot.rsi,
            ema20: snapshot.ema20,
            ema50: snapshot.ema50,
            macd_histogram: snapshot.macd.histogram,
            stoch_k: snapshot.stoch_rsi.k,
            candles: recent[tail_start..]
                .iter()
                .map(|c| CandlePoint {
                    close: c.close,
                    volume: c.volume,
                })
                .collect(),
            api_key: &self.api_key,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let parsed: AnalyzeResponse = response.json().await?;
        Ok(self.to_signal(parsed))
    }

    fn name(&self) -> &str {
        "remote-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Macd, StochRsi};
    use chrono::Utc;

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi: 42.0,
            ma50: 2350.0,
            ema20: 2351.0,
            ema50: 2350.0,
            macd: Macd {
                macd: 0.4,
                signal: 0.1,
                histogram: 0.3,
            },
            stoch_rsi: StochRsi { k: 35.0, d: 40.0 },
        }
    }

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                bucket_start: Utc::now(),
                open: 2350.0,
                high: 2351.0,
                low: 2349.0,
                close: 2350.0 + i as f64 * 0.1,
                volume: 100.0,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_parses_buy_verdict() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/analyze")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"signal":"BUY","confidence":92,"trend":"UP","support":2345.0,"resistance":2356.0,"reasoning":"model says up"}"#,
            )
            .create_async()
            .await;

        let provider = RemoteProvider::new(format!("{}/analyze", server.url()), "key");
        let signal = provider.analyze(&snapshot(), &candles(20)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(signal.signal, SignalType::Buy);
        assert_eq!(signal.confidence, 92);
        assert_eq!(signal.trend, Trend::Up);
        assert_eq!(signal.support, 2345.0);
    }

    #[tokio::test]
    async fn test_unknown_verdict_degrades_to_hold() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/analyze")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"signal":"SHRUG","confidence":120,"support":0.0,"resistance":0.0,"reasoning":"?"}"#,
            )
            .create_async()
            .await;

        let provider = RemoteProvider::new(format!("{}/analyze", server.url()), "key");
        let signal = provider.analyze(&snapshot(), &candles(5)).await.unwrap();

        assert_eq!(signal.signal, SignalType::Hold);
        // Confidence clamped into range
        assert_eq!(signal.confidence, 99);
        assert_eq!(signal.trend, Trend::Sideways);
    }

    #[tokio::test]
    async fn test_http_error_propagates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/analyze")
            .with_status(429)
            .create_async()
            .await;

        let provider = RemoteProvider::new(format!("{}/analyze", server.url()), "key");
        let result = provider.analyze(&snapshot(), &candles(5)).await;
        assert!(result.is_err());
    }
}
