use analysis_core::{ChangeBasis, MoverEntry, RankedEntry, RunMode, SymbolRecord};
use chrono::{DateTime, Utc};
use fundamental_analysis::fund_score_map;
use portfolio_manager::{common_holdings, summarize, CommonHolding, PortfolioEvaluator, PortfolioPosition, PortfolioSummary};
use serde::{Deserialize, Serialize};

use crate::offline::or_placeholder;
use crate::store::StoredTables;

/// Everything the dashboard page renders. Values are final; the renderer
/// only formats them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub mode: RunMode,
    pub gainers: Vec<MoverEntry>,
    pub losers: Vec<MoverEntry>,
    pub momentum: Vec<RankedEntry>,
    pub portfolio: Vec<PortfolioPosition>,
    pub common_holdings: Vec<CommonHolding>,
    pub summary: PortfolioSummary,
    pub generated_at: DateTime<Utc>,
}

impl DashboardData {
    /// Build the page data from stored tables.
    ///
    /// With `fundamentals` present, portfolio suggestions are recomputed
    /// against the current common set; otherwise the stored ones are kept.
    pub fn assemble(
        stored: StoredTables,
        fundamentals: Option<&[SymbolRecord]>,
        evaluator: &PortfolioEvaluator,
        display_rows: usize,
    ) -> Self {
        let StoredTables { tables, written_at } = stored;
        let mode = mode_of(&tables.gainers);

        let mut portfolio = tables.portfolio;
        let records = fundamentals.unwrap_or_default();
        if fundamentals.is_some() {
            evaluator.assign_suggestions(&mut portfolio, &fund_score_map(records));
        }

        let common = or_placeholder(common_holdings(&portfolio, records), CommonHolding::placeholder);
        let summary = summarize(&portfolio);

        Self {
            mode,
            gainers: truncated(tables.gainers, display_rows),
            losers: truncated(tables.losers, display_rows),
            momentum: truncated(tables.momentum, display_rows),
            portfolio,
            common_holdings: common,
            summary,
            generated_at: written_at,
        }
    }
}

/// Offline runs write estimate-basis movers, placeholders included.
fn mode_of(gainers: &[MoverEntry]) -> RunMode {
    match gainers.first().map(|g| g.basis) {
        Some(ChangeBasis::Estimate) => RunMode::Offline,
        _ => RunMode::Live,
    }
}

fn truncated<T>(mut rows: Vec<T>, n: usize) -> Vec<T> {
    rows.truncate(n);
    rows
}
