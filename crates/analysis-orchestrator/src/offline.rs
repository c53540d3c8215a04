//! Estimated tables computed from fundamentals alone.
//!
//! Used whenever live quotes are unavailable. Gainers and losers rank by
//! fund_score in place of a price change (marked `basis = estimate`), and the
//! momentum table uses a fundamentals-only proxy with tercile signal bands
//! taken over the rows it keeps.

use analysis_core::adaptive::tercile_bounds;
use analysis_core::{ChangeBasis, MoverEntry, RankedEntry, Signal, SymbolRecord};

use crate::ranker::{ascending, descending};

/// Weights of the offline technical proxy
const PROXY_ROE_WEIGHT: f64 = 0.4;
const PROXY_SALES_WEIGHT: f64 = 0.3;
const PROXY_PROFIT_WEIGHT: f64 = 0.3;
const PROXY_DEBT_PENALTY: f64 = 0.2;

pub fn estimated_gainers(records: &[SymbolRecord], top_n: usize) -> Vec<MoverEntry> {
    let mut movers = estimates(records);
    movers.sort_by(|a, b| descending(a.pct_change, b.pct_change).then_with(|| a.symbol.cmp(&b.symbol)));
    movers.truncate(top_n);
    movers
}

pub fn estimated_losers(records: &[SymbolRecord], top_n: usize) -> Vec<MoverEntry> {
    let mut movers = estimates(records);
    movers.sort_by(|a, b| ascending(a.pct_change, b.pct_change).then_with(|| a.symbol.cmp(&b.symbol)));
    movers.truncate(top_n);
    movers
}

fn estimates(records: &[SymbolRecord]) -> Vec<MoverEntry> {
    records
        .iter()
        .map(|r| MoverEntry {
            symbol: r.symbol.clone(),
            price: None,
            volume: None,
            pct_change: r.fund_score,
            basis: ChangeBasis::Estimate,
        })
        .collect()
}

/// Fundamentals-only momentum table. Signal bands are the terciles of the
/// rows kept after truncation to `top_n`, so every written table spans
/// buy, hold and sell.
pub fn estimated_momentum(records: &[SymbolRecord], top_n: usize) -> Vec<RankedEntry> {
    let mut entries: Vec<RankedEntry> = records
        .iter()
        .map(|r| {
            let tech_score = r.roe * PROXY_ROE_WEIGHT
                + r.sales_growth * PROXY_SALES_WEIGHT
                + r.profit_growth * PROXY_PROFIT_WEIGHT;
            RankedEntry {
                symbol: r.symbol.clone(),
                price: None,
                rsi: None,
                signal: Signal::Hold,
                tech_score,
                fund_score: Some(r.fund_score),
                final_score: tech_score - r.debt * PROXY_DEBT_PENALTY,
            }
        })
        .collect();

    entries.sort_by(|a, b| descending(a.final_score, b.final_score).then_with(|| a.symbol.cmp(&b.symbol)));
    entries.truncate(top_n);

    let finals: Vec<f64> = entries.iter().map(|e| e.final_score).collect();
    let Some((low, high)) = tercile_bounds(&finals) else {
        return Vec::new();
    };
    for entry in &mut entries {
        entry.signal = tercile_signal(entry.final_score, low, high);
    }
    entries
}

fn tercile_signal(score: f64, low: f64, high: f64) -> Signal {
    if score >= high {
        Signal::Buy
    } else if score <= low {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

/// A table is never written empty.
pub fn or_placeholder<T>(mut rows: Vec<T>, placeholder: impl FnOnce() -> T) -> Vec<T> {
    if rows.is_empty() {
        rows.push(placeholder());
    }
    rows
}
