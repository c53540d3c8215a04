use analysis_core::{FetchFailure, PriceSeries, Quote, QuoteSource};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Result of fetching one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Fetched(T),
    Skipped { symbol: String, reason: FetchFailure },
}

/// Every symbol of a batch lands in exactly one of the two lists.
#[derive(Debug, Clone)]
pub struct BatchResult<T> {
    pub fetched: Vec<T>,
    pub skipped: Vec<(String, FetchFailure)>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self {
            fetched: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> BatchResult<T> {
    pub fn push(&mut self, outcome: FetchOutcome<T>) {
        match outcome {
            FetchOutcome::Fetched(value) => self.fetched.push(value),
            FetchOutcome::Skipped { symbol, reason } => self.skipped.push((symbol, reason)),
        }
    }

    pub fn success_count(&self) -> usize {
        self.fetched.len()
    }

    pub fn skip_count(&self) -> usize {
        self.skipped.len()
    }

    /// Skips matching `pred`, e.g. only timeouts.
    pub fn skip_count_where(&self, pred: impl Fn(&FetchFailure) -> bool) -> usize {
        self.skipped.iter().filter(|(_, reason)| pred(reason)).count()
    }
}

/// Per-symbol fetch loop with a call timeout, one retry for transient
/// failures and a deadline shared by every batch of a cycle.
///
/// Waiting for a rate-limit slot (`QuoteSource::reserve`) is bounded only by
/// the deadline; the call timeout starts once the slot is granted.
#[derive(Debug, Clone)]
pub struct SnapshotFetcher {
    call_timeout: Duration,
    batch_deadline: Duration,
}

impl SnapshotFetcher {
    pub fn new(call_timeout: Duration, batch_deadline: Duration) -> Self {
        Self {
            call_timeout,
            batch_deadline,
        }
    }

    /// Deadline for a cycle starting now.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.batch_deadline
    }

    pub async fn fetch_quotes(
        &self,
        source: &dyn QuoteSource,
        symbols: &[String],
        deadline: Instant,
    ) -> BatchResult<Quote> {
        let result = self
            .run(source, symbols, deadline, |symbol| async move { source.latest_quote(&symbol).await })
            .await;
        tracing::info!(
            "Quotes: {} fetched, {} skipped of {}",
            result.success_count(),
            result.skip_count(),
            symbols.len()
        );
        result
    }

    pub async fn fetch_histories(
        &self,
        source: &dyn QuoteSource,
        symbols: &[String],
        days: i64,
        deadline: Instant,
    ) -> BatchResult<PriceSeries> {
        let result = self
            .run(source, symbols, deadline, |symbol| async move {
                source.price_history(&symbol, days).await
            })
            .await;
        tracing::info!(
            "Histories: {} fetched, {} skipped of {}",
            result.success_count(),
            result.skip_count(),
            symbols.len()
        );
        result
    }

    async fn run<T, F, Fut>(
        &self,
        source: &dyn QuoteSource,
        symbols: &[String],
        deadline: Instant,
        call: F,
    ) -> BatchResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, FetchFailure>>,
    {
        let mut result = BatchResult::default();

        for symbol in symbols {
            if Instant::now() >= deadline {
                result.push(FetchOutcome::Skipped {
                    symbol: symbol.clone(),
                    reason: FetchFailure::DeadlineExceeded,
                });
                continue;
            }

            let outcome = match self.attempt_twice(source, symbol, deadline, &call).await {
                Ok(value) => FetchOutcome::Fetched(value),
                Err(reason) => {
                    tracing::debug!("Skipping {}: {}", symbol, reason);
                    FetchOutcome::Skipped {
                        symbol: symbol.clone(),
                        reason,
                    }
                }
            };
            result.push(outcome);
        }

        let expired = result.skip_count_where(|r| *r == FetchFailure::DeadlineExceeded);
        if expired > 0 {
            tracing::warn!("Cycle deadline hit, {} symbols not fetched", expired);
        }
        result
    }

    async fn attempt_twice<T, F, Fut>(
        &self,
        source: &dyn QuoteSource,
        symbol: &str,
        deadline: Instant,
        call: &F,
    ) -> Result<T, FetchFailure>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, FetchFailure>>,
    {
        match self.attempt(source, symbol, deadline, call).await {
            Err(e) if e.is_transient() => {
                tracing::debug!("Retrying {} after {}", symbol, e);
                self.attempt(source, symbol, deadline, call).await
            }
            other => other,
        }
    }

    async fn attempt<T, F, Fut>(
        &self,
        source: &dyn QuoteSource,
        symbol: &str,
        deadline: Instant,
        call: &F,
    ) -> Result<T, FetchFailure>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, FetchFailure>>,
    {
        if tokio::time::timeout_at(deadline, source.reserve()).await.is_err() {
            return Err(FetchFailure::DeadlineExceeded);
        }
        match tokio::time::timeout(self.call_timeout, call(symbol.to_string())).await {
            Ok(result) => result,
            Err(_) => Err(FetchFailure::Timeout),
        }
    }
}
