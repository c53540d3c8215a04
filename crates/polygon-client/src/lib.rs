use analysis_core::{AnalysisError, FetchFailure, PriceBar, PriceSeries, Quote, QuoteSource};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).duration_since(now) + Duration::from_millis(50),
                None => Duration::from_millis(50),
            };
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Polygon API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Polygon REST client used as the live quote source.
#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
    base_url: String,
}

impl PolygonClient {
    /// `rate_limit` is requests per minute; `timeout` bounds each HTTP call.
    pub fn new(api_key: String, rate_limit: usize, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at another host (proxies, recorded fixtures).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send a request after waiting for a rate-limit slot.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, FetchFailure> {
        self.rate_limiter.acquire().await;
        self.dispatch(builder).await
    }

    /// Send without touching the limiter; the caller already holds a slot.
    /// A 429 is surfaced as a transient network failure so the caller's
    /// bounded retry decides what happens next.
    async fn dispatch(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, FetchFailure> {
        let response = builder.send().await.map_err(map_reqwest_error)?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(FetchFailure::NotFound),
            StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!("Polygon 429 rate limited");
                Err(FetchFailure::Network("rate limited (HTTP 429)".to_string()))
            }
            status => Err(FetchFailure::Network(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            ))),
        }
    }

    /// Get snapshot for a ticker (last trade, today's bar, previous day)
    pub async fn get_snapshot(&self, symbol: &str) -> Result<SnapshotTicker, FetchFailure> {
        self.rate_limiter.acquire().await;
        self.fetch_snapshot(symbol).await
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<SnapshotTicker, FetchFailure> {
        let url = format!(
            "{}/v2/snapshot/locale/us/markets/stocks/tickers/{}",
            self.base_url, symbol
        );

        let response = self
            .dispatch(self.client.get(&url).query(&[("apiKey", &self.api_key)]))
            .await?;

        let snap_response: SnapshotResponse = response
            .json()
            .await
            .map_err(|e| FetchFailure::Network(e.to_string()))?;

        snap_response.ticker.ok_or(FetchFailure::NotFound)
    }

    /// Get daily bars between two dates
    pub async fn get_daily_bars(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, FetchFailure> {
        self.rate_limiter.acquire().await;
        self.fetch_daily_bars(symbol, from, to).await
    }

    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, FetchFailure> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            self.base_url,
            symbol,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self
            .dispatch(self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
            ]))
            .await?;

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| FetchFailure::Network(e.to_string()))?;

        Ok(bars_from_aggregates(agg_response.results))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Network(e.to_string())
    }
}

/// Map a snapshot to a quote. Price prefers the last trade, then today's close.
pub fn quote_from_snapshot(symbol: &str, snapshot: &SnapshotTicker) -> Result<Quote, FetchFailure> {
    let price = snapshot
        .last_trade
        .as_ref()
        .and_then(|t| t.p)
        .or_else(|| snapshot.day.as_ref().and_then(|d| d.c))
        .filter(|p| *p > 0.0)
        .ok_or(FetchFailure::MissingField("lastTrade.p"))?;
    let previous_close = snapshot
        .prev_day
        .as_ref()
        .and_then(|d| d.c)
        .ok_or(FetchFailure::MissingField("prevDay.c"))?;
    let volume = snapshot
        .day
        .as_ref()
        .and_then(|d| d.v)
        .ok_or(FetchFailure::MissingField("day.v"))?;

    Ok(Quote {
        symbol: symbol.to_string(),
        price,
        previous_close,
        volume,
    })
}

fn bars_from_aggregates(results: Vec<AggregateResult>) -> Vec<PriceBar> {
    results
        .into_iter()
        .filter_map(|r| {
            let date = DateTime::from_timestamp_millis(r.t)?.date_naive();
            Some(PriceBar {
                date,
                close: r.c,
                volume: r.v,
            })
        })
        .collect()
}

#[async_trait]
impl QuoteSource for PolygonClient {
    async fn probe(&self) -> Result<(), AnalysisError> {
        let url = format!("{}/v1/marketstatus/now", self.base_url);
        self.send_request(self.client.get(&url).query(&[("apiKey", &self.api_key)]))
            .await
            .map(|_| ())
            .map_err(|e| AnalysisError::SourceUnavailable(e.to_string()))
    }

    async fn reserve(&self) {
        self.rate_limiter.acquire().await;
    }

    // The trait calls below rely on `reserve` having taken the slot

    async fn latest_quote(&self, symbol: &str) -> Result<Quote, FetchFailure> {
        let snapshot = self.fetch_snapshot(symbol).await?;
        quote_from_snapshot(symbol, &snapshot)
    }

    async fn price_history(&self, symbol: &str, days: i64) -> Result<PriceSeries, FetchFailure> {
        let to = Utc::now();
        let from = to - ChronoDuration::days(days);
        let bars = self.fetch_daily_bars(symbol, from, to).await?;
        if bars.is_empty() {
            return Err(FetchFailure::NotFound);
        }
        Ok(PriceSeries::new(symbol, bars))
    }
}

// Response structures
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp (ms)
    c: f64, // close
    v: f64, // volume
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    ticker: Option<SnapshotTicker>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTicker {
    pub day: Option<SnapshotDay>,
    #[serde(rename = "lastTrade")]
    pub last_trade: Option<SnapshotLastTrade>,
    #[serde(rename = "prevDay")]
    pub prev_day: Option<SnapshotDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDay {
    pub o: Option<f64>,
    pub h: Option<f64>,
    pub l: Option<f64>,
    pub c: Option<f64>,
    pub v: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLastTrade {
    pub p: Option<f64>,
    pub s: Option<i64>,
    pub t: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "status": "OK",
        "ticker": {
            "ticker": "AAPL",
            "day": {"o": 180.0, "h": 184.0, "l": 179.5, "c": 183.2, "v": 5200000},
            "lastTrade": {"p": 183.5, "s": 100, "t": 1700000000000},
            "prevDay": {"o": 178.0, "h": 181.0, "l": 177.0, "c": 180.0, "v": 4800000}
        }
    }"#;

    #[test]
    fn test_quote_from_snapshot() {
        let resp: SnapshotResponse = serde_json::from_str(SNAPSHOT).unwrap();
        let quote = quote_from_snapshot("AAPL", &resp.ticker.unwrap()).unwrap();
        assert_eq!(quote.price, 183.5);
        assert_eq!(quote.previous_close, 180.0);
        assert_eq!(quote.volume, 5_200_000.0);
    }

    #[test]
    fn test_quote_falls_back_to_day_close() {
        let snapshot = SnapshotTicker {
            day: Some(SnapshotDay { o: None, h: None, l: None, c: Some(50.0), v: Some(10.0) }),
            last_trade: None,
            prev_day: Some(SnapshotDay { o: None, h: None, l: None, c: Some(48.0), v: None }),
        };
        let quote = quote_from_snapshot("XYZ", &snapshot).unwrap();
        assert_eq!(quote.price, 50.0);
    }

    #[test]
    fn test_quote_missing_prev_close() {
        let snapshot = SnapshotTicker {
            day: Some(SnapshotDay { o: None, h: None, l: None, c: Some(50.0), v: Some(10.0) }),
            last_trade: None,
            prev_day: None,
        };
        assert_eq!(
            quote_from_snapshot("XYZ", &snapshot),
            Err(FetchFailure::MissingField("prevDay.c"))
        );
    }

    #[test]
    fn test_bars_from_aggregates() {
        let body = r#"{"results": [
            {"t": 1704171600000, "o": 1, "h": 1, "l": 1, "c": 10.5, "v": 100},
            {"t": 1704258000000, "o": 1, "h": 1, "l": 1, "c": 11.0, "v": 200}
        ]}"#;
        let resp: AggregateResponse = serde_json::from_str(body).unwrap();
        let bars = bars_from_aggregates(resp.results);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 11.0);
        assert!(bars[0].date < bars[1].date);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_waits_for_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reserve_takes_a_limiter_slot() {
        let client = PolygonClient::new("key".to_string(), 1, Duration::from_secs(5));
        let start = Instant::now();

        client.reserve().await;
        client.reserve().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[test]
    fn test_missing_ticker_deserializes() {
        let resp: SnapshotResponse = serde_json::from_str(r#"{"status": "NOT_FOUND"}"#).unwrap();
        assert!(resp.ticker.is_none());
    }
}
