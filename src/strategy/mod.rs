// Signal generation module
pub mod fallback;
pub mod remote;
pub mod scorer;

use crate::models::{Candle, IndicatorSnapshot, Signal};
use crate::Result;
use async_trait::async_trait;

pub use fallback::FallbackProvider;
pub use remote::RemoteProvider;
pub use scorer::{score, LocalHeuristicProvider, ScorerConfig};

/// Capability for turning an indicator snapshot into a trading signal.
///
/// Implementations may do I/O and fail (the remote model provider); the
/// local heuristic one never does. Callers that must not fail compose a
/// remote with the local fallback via [`FallbackProvider`].
#[async_trait]
pub trait SignalProvider: Send + Sync {
    /// Evaluate the market picture. `recent` is the finalized candle tail,
    /// oldest first; the last candle anchors support/resistance levels.
    async fn analyze(&self, snapshot: &IndicatorSnapshot, recent: &[Candle]) -> Result<Signal>;

    /// Provider name for logs
    fn name(&self) -> &str;
}
