use analysis_core::{ChangeBasis, MoverEntry, Quote, RankedEntry, TechnicalSignal};
use std::cmp::Ordering;
use std::collections::HashMap;

const TECH_WEIGHT: f64 = 0.6;
const FUND_WEIGHT: f64 = 0.4;

/// Merges technical and fundamental scores into the momentum table and
/// ranks quotes into gainers and losers.
#[derive(Debug, Clone)]
pub struct CompositeRanker {
    top_n: usize,
}

impl CompositeRanker {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Signals without a tech_score (BUY/HOLD) are left out. A missing
    /// fund_score counts as zero in the blend but stays empty in the row.
    pub fn rank_momentum(&self, signals: &[TechnicalSignal], fund_scores: &HashMap<String, f64>) -> Vec<RankedEntry> {
        let mut entries: Vec<RankedEntry> = signals
            .iter()
            .filter_map(|s| {
                let tech_score = s.tech_score?;
                let fund_score = fund_scores.get(&s.symbol).copied();
                Some(RankedEntry {
                    symbol: s.symbol.clone(),
                    price: Some(s.price),
                    rsi: Some(s.rsi),
                    signal: s.signal,
                    tech_score,
                    fund_score,
                    final_score: tech_score * TECH_WEIGHT + fund_score.unwrap_or(0.0) * FUND_WEIGHT,
                })
            })
            .collect();

        entries.sort_by(|a, b| descending(a.final_score, b.final_score).then_with(|| a.symbol.cmp(&b.symbol)));
        entries.truncate(self.top_n);
        entries
    }

    pub fn top_gainers(&self, quotes: &[Quote]) -> Vec<MoverEntry> {
        let mut movers = live_movers(quotes);
        movers.sort_by(|a, b| descending(a.pct_change, b.pct_change).then_with(|| a.symbol.cmp(&b.symbol)));
        movers.truncate(self.top_n);
        movers
    }

    pub fn top_losers(&self, quotes: &[Quote]) -> Vec<MoverEntry> {
        let mut movers = live_movers(quotes);
        movers.sort_by(|a, b| ascending(a.pct_change, b.pct_change).then_with(|| a.symbol.cmp(&b.symbol)));
        movers.truncate(self.top_n);
        movers
    }
}

/// Quotes without a defined change (no previous close) are not movers.
fn live_movers(quotes: &[Quote]) -> Vec<MoverEntry> {
    quotes
        .iter()
        .filter_map(|q| {
            Some(MoverEntry {
                symbol: q.symbol.clone(),
                price: Some(q.price),
                volume: Some(q.volume),
                pct_change: q.pct_change()?,
                basis: ChangeBasis::Live,
            })
        })
        .collect()
}

pub(crate) fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

pub(crate) fn ascending(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}
