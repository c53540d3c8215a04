use async_trait::async_trait;
use crate::{AnalysisError, FetchFailure, PriceSeries, Quote};

/// Live market data collaborator. Failures are per symbol and never fatal
/// to a batch; `probe` reports whether the source is reachable at all.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn probe(&self) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// Wait until the source will accept another request. Callers reserve
    /// before each `latest_quote` or `price_history` call.
    async fn reserve(&self) {}

    async fn latest_quote(&self, symbol: &str) -> Result<Quote, FetchFailure>;

    /// Daily closes and volumes for the trailing `days` calendar days, oldest first.
    async fn price_history(&self, symbol: &str, days: i64) -> Result<PriceSeries, FetchFailure>;
}
