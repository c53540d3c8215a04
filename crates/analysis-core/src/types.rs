use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical join key: uppercase with all whitespace removed.
///
/// Every component that produces a symbol goes through this function,
/// otherwise joins between fundamentals, quotes and holdings drop rows.
pub fn normalize_symbol(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// One scored fundamentals row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub symbol: String,
    pub roe: f64,
    pub debt: f64,
    pub sales_growth: f64,
    pub profit_growth: f64,
    pub fund_score: f64,
}

/// Latest quote for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: f64,
    pub volume: f64,
}

impl Quote {
    /// Day change in percent; undefined without a previous close.
    pub fn pct_change(&self) -> Option<f64> {
        if self.previous_close == 0.0 {
            return None;
        }
        let pct = (self.price - self.previous_close) / self.previous_close * 100.0;
        pct.is_finite().then_some(pct)
    }
}

/// Daily close/volume observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
}

/// Chronologically ordered history for one symbol
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: &str, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            symbol: normalize_symbol(symbol),
            bars,
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Trend/momentum classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator snapshot on the latest session of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSignal {
    pub symbol: String,
    pub price: f64,
    pub rsi: f64,
    pub sma50: f64,
    pub sma200: f64,
    /// Only defined for `Signal::Sell`.
    pub tech_score: Option<f64>,
    pub signal: Signal,
}

/// One row of the momentum table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub symbol: String,
    pub price: Option<f64>,
    pub rsi: Option<f64>,
    pub signal: Signal,
    pub tech_score: f64,
    pub fund_score: Option<f64>,
    pub final_score: f64,
}

impl RankedEntry {
    pub fn placeholder() -> Self {
        Self {
            symbol: PLACEHOLDER_SYMBOL.to_string(),
            price: None,
            rsi: None,
            signal: Signal::Hold,
            tech_score: 0.0,
            fund_score: None,
            final_score: 0.0,
        }
    }
}

/// Whether a mover's change is a live price move or a fundamentals estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeBasis {
    Live,
    Estimate,
}

/// One row of the gainers/losers tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoverEntry {
    pub symbol: String,
    pub price: Option<f64>,
    pub volume: Option<f64>,
    pub pct_change: f64,
    pub basis: ChangeBasis,
}

impl MoverEntry {
    pub fn placeholder(basis: ChangeBasis) -> Self {
        Self {
            symbol: PLACEHOLDER_SYMBOL.to_string(),
            price: None,
            volume: None,
            pct_change: 0.0,
            basis,
        }
    }
}

/// Symbol written into tables that would otherwise be empty.
pub const PLACEHOLDER_SYMBOL: &str = "N/A";

/// How a regeneration obtained its prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Live,
    Offline,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Live => f.write_str("live"),
            RunMode::Offline => f.write_str("offline"),
        }
    }
}
