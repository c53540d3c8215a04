use analysis_core::PLACEHOLDER_SYMBOL;
use serde::{Deserialize, Serialize};

/// A row of the user's portfolio sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub entry_price: f64,
    pub quantity: f64,
    /// Current price column of the sheet, if it has one
    pub last_price: Option<f64>,
    /// Precomputed P&L column of the sheet, if it has one
    pub reported_pnl: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Suggestion {
    Hold,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Performance {
    Gain,
    Loss,
}

impl Performance {
    pub fn from_pnl(pnl: f64) -> Self {
        if pnl >= 0.0 {
            Performance::Gain
        } else {
            Performance::Loss
        }
    }
}

/// One row of the portfolio-performance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPosition {
    pub symbol: String,
    pub entry: f64,
    pub current: f64,
    pub quantity: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub fund_score: Option<f64>,
    pub performance: Performance,
    pub suggestion: Suggestion,
}

impl PortfolioPosition {
    pub fn placeholder() -> Self {
        Self {
            symbol: PLACEHOLDER_SYMBOL.to_string(),
            entry: 0.0,
            current: 0.0,
            quantity: 0.0,
            pnl: 0.0,
            pnl_pct: 0.0,
            fund_score: None,
            performance: Performance::Gain,
            suggestion: Suggestion::Hold,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.symbol == PLACEHOLDER_SYMBOL
    }

    pub fn market_value(&self) -> f64 {
        self.current * self.quantity
    }
}

/// A holding that also appears in the fundamentals sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonHolding {
    pub symbol: String,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub roe: f64,
    pub debt: f64,
    pub sales_growth: f64,
    pub profit_growth: f64,
    pub fund_score: f64,
    pub suggestion: Suggestion,
}

impl CommonHolding {
    /// Stands in when no holding appears in the fundamentals sheet.
    pub fn placeholder() -> Self {
        Self {
            symbol: PLACEHOLDER_SYMBOL.to_string(),
            pnl: 0.0,
            pnl_pct: 0.0,
            roe: 0.0,
            debt: 0.0,
            sales_growth: 0.0,
            profit_growth: 0.0,
            fund_score: 0.0,
            suggestion: Suggestion::Hold,
        }
    }
}

/// Headline numbers for the dashboard cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub total_pnl: f64,
    /// Percent of positions with positive P&L, 2 dp
    pub win_rate: f64,
    /// Symbol with the largest P&L, "-" when there are no positions
    pub best_symbol: String,
}
