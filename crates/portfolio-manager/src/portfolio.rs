use analysis_core::adaptive::quantile;
use analysis_core::{Quote, SymbolRecord};
use std::collections::HashMap;

use crate::models::*;

/// Turns holdings into priced positions with HOLD/REVIEW suggestions.
pub struct PortfolioEvaluator {
    /// REVIEW needs pnl_pct strictly below this
    review_loss_pct: f64,
    /// ...and a fund_score at or below this quantile of the common set
    review_fund_quantile: f64,
}

impl Default for PortfolioEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl PortfolioEvaluator {
    pub fn new() -> Self {
        Self {
            review_loss_pct: -10.0,
            review_fund_quantile: 0.4,
        }
    }

    /// Price every holding and assign suggestions.
    ///
    /// Current price comes from the live quote, else the sheet's own current
    /// price, else the entry price. A sheet P&L figure is only trusted when no
    /// live quote was used.
    pub fn evaluate(
        &self,
        holdings: &[Holding],
        quotes: &HashMap<String, Quote>,
        fund_scores: &HashMap<String, f64>,
    ) -> Vec<PortfolioPosition> {
        let mut degraded = 0usize;
        let mut positions: Vec<PortfolioPosition> = holdings
            .iter()
            .map(|h| {
                let live = quotes.get(&h.symbol).map(|q| q.price);
                if live.is_none() {
                    degraded += 1;
                }
                let current = live.or(h.last_price).unwrap_or(h.entry_price);
                let pnl = match (live, h.reported_pnl) {
                    (None, Some(reported)) => reported,
                    _ => (current - h.entry_price) * h.quantity,
                };
                PortfolioPosition {
                    symbol: h.symbol.clone(),
                    entry: h.entry_price,
                    current,
                    quantity: h.quantity,
                    pnl,
                    pnl_pct: pnl_pct(h.entry_price, current),
                    fund_score: None,
                    performance: Performance::from_pnl(pnl),
                    suggestion: Suggestion::Hold,
                }
            })
            .collect();

        if degraded > 0 {
            tracing::warn!("{} of {} holdings priced without a live quote", degraded, holdings.len());
        }

        self.assign_suggestions(&mut positions, fund_scores);
        positions
    }

    /// Attach fund scores and recompute HOLD/REVIEW against the current
    /// common-symbol set. The cutoff is relative, so a position's suggestion
    /// can change when the portfolio composition changes.
    pub fn assign_suggestions(&self, positions: &mut [PortfolioPosition], fund_scores: &HashMap<String, f64>) {
        let common: Vec<f64> = positions
            .iter()
            .filter_map(|p| fund_scores.get(&p.symbol).copied())
            .collect();
        let cutoff = quantile(&common, self.review_fund_quantile).unwrap_or(0.0);

        for position in positions.iter_mut() {
            position.fund_score = fund_scores.get(&position.symbol).copied();
            position.suggestion = self.suggest(position.pnl_pct, position.fund_score, cutoff);
        }
    }

    pub fn suggest(&self, pnl_pct: f64, fund_score: Option<f64>, cutoff: f64) -> Suggestion {
        match fund_score {
            Some(score) if pnl_pct < self.review_loss_pct && score <= cutoff => Suggestion::Review,
            _ => Suggestion::Hold,
        }
    }
}

/// (current − entry) / entry × 100, zero when entry is zero.
pub fn pnl_pct(entry: f64, current: f64) -> f64 {
    if entry == 0.0 {
        return 0.0;
    }
    (current - entry) / entry * 100.0
}

/// Holdings that also appear in fundamentals, best fund_score first.
pub fn common_holdings(positions: &[PortfolioPosition], records: &[SymbolRecord]) -> Vec<CommonHolding> {
    let by_symbol: HashMap<&str, &SymbolRecord> = records.iter().map(|r| (r.symbol.as_str(), r)).collect();

    let mut common: Vec<CommonHolding> = positions
        .iter()
        .filter_map(|p| {
            let r = by_symbol.get(p.symbol.as_str())?;
            Some(CommonHolding {
                symbol: p.symbol.clone(),
                pnl: p.pnl,
                pnl_pct: p.pnl_pct,
                roe: r.roe,
                debt: r.debt,
                sales_growth: r.sales_growth,
                profit_growth: r.profit_growth,
                fund_score: r.fund_score,
                suggestion: p.suggestion,
            })
        })
        .collect();

    common.sort_by(|a, b| {
        b.fund_score
            .total_cmp(&a.fund_score)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    common
}

/// Totals, win rate and best performer. Placeholder rows are ignored.
pub fn summarize(positions: &[PortfolioPosition]) -> PortfolioSummary {
    let real: Vec<&PortfolioPosition> = positions.iter().filter(|p| !p.is_placeholder()).collect();

    let total_value = real.iter().map(|p| p.market_value()).sum();
    let total_pnl = real.iter().map(|p| p.pnl).sum();
    let wins = real.iter().filter(|p| p.pnl > 0.0).count();
    let win_rate = if real.is_empty() {
        0.0
    } else {
        (wins as f64 / real.len() as f64 * 100.0 * 100.0).round() / 100.0
    };
    let best_symbol = real
        .iter()
        .max_by(|a, b| a.pnl.total_cmp(&b.pnl).then_with(|| b.symbol.cmp(&a.symbol)))
        .map(|p| p.symbol.clone())
        .unwrap_or_else(|| "-".to_string());

    PortfolioSummary {
        total_value,
        total_pnl,
        win_rate,
        best_symbol,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(symbol: &str, entry: f64, quantity: f64) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            entry_price: entry,
            quantity,
            last_price: None,
            reported_pnl: None,
        }
    }

    fn quote(symbol: &str, price: f64) -> (String, Quote) {
        (
            symbol.to_string(),
            Quote {
                symbol: symbol.to_string(),
                price,
                previous_close: price,
                volume: 0.0,
            },
        )
    }

    fn position(symbol: &str, pnl_pct: f64) -> PortfolioPosition {
        PortfolioPosition {
            symbol: symbol.to_string(),
            pnl_pct,
            ..PortfolioPosition::placeholder()
        }
    }

    #[test]
    fn test_pnl_from_live_quote() {
        let quotes: HashMap<_, _> = [quote("ABC", 120.0)].into_iter().collect();
        let positions = PortfolioEvaluator::new().evaluate(&[holding("ABC", 100.0, 10.0)], &quotes, &HashMap::new());

        assert_eq!(positions[0].current, 120.0);
        assert!((positions[0].pnl - 200.0).abs() < 1e-9);
        assert!((positions[0].pnl_pct - 20.0).abs() < 1e-9);
        assert_eq!(positions[0].performance, Performance::Gain);
    }

    #[test]
    fn test_zero_entry_has_zero_pct() {
        assert_eq!(pnl_pct(0.0, 50.0), 0.0);
        let quotes: HashMap<_, _> = [quote("ABC", 50.0)].into_iter().collect();
        let positions = PortfolioEvaluator::new().evaluate(&[holding("ABC", 0.0, 2.0)], &quotes, &HashMap::new());
        assert_eq!(positions[0].pnl_pct, 0.0);
        assert_eq!(positions[0].pnl, 100.0);
    }

    #[test]
    fn test_degraded_pricing_order() {
        let mut with_ltp = holding("LTP", 100.0, 1.0);
        with_ltp.last_price = Some(90.0);
        let mut with_reported = holding("REP", 100.0, 1.0);
        with_reported.reported_pnl = Some(-7.5);
        let plain = holding("PLAIN", 100.0, 3.0);

        let positions = PortfolioEvaluator::new().evaluate(
            &[with_ltp, with_reported, plain],
            &HashMap::new(),
            &HashMap::new(),
        );

        assert_eq!(positions[0].current, 90.0);
        assert_eq!(positions[0].pnl, -10.0);
        assert_eq!(positions[0].performance, Performance::Loss);
        assert_eq!(positions[1].current, 100.0);
        assert_eq!(positions[1].pnl, -7.5);
        assert_eq!(positions[2].current, 100.0);
        assert_eq!(positions[2].pnl, 0.0);
        assert_eq!(positions[2].pnl_pct, 0.0);
    }

    #[test]
    fn test_live_quote_overrides_reported_pnl() {
        let mut h = holding("ABC", 100.0, 2.0);
        h.reported_pnl = Some(999.0);
        let quotes: HashMap<_, _> = [quote("ABC", 110.0)].into_iter().collect();
        let positions = PortfolioEvaluator::new().evaluate(&[h], &quotes, &HashMap::new());
        assert_eq!(positions[0].pnl, 20.0);
    }

    #[test]
    fn test_review_when_losing_and_weak_fundamentals() {
        let evaluator = PortfolioEvaluator::new();
        let scores: HashMap<String, f64> = [("A", 1.0), ("B", 2.0), ("C", 3.0), ("D", 4.0), ("E", 5.0)]
            .into_iter()
            .map(|(s, v)| (s.to_string(), v))
            .collect();

        // Cutoff over [1,2,3,4,5] is 2.6
        let mut positions = vec![
            position("A", 0.0),
            position("B", -15.0),
            position("C", 0.0),
            position("D", 0.0),
            position("E", -15.0),
        ];
        evaluator.assign_suggestions(&mut positions, &scores);

        assert_eq!(positions[1].fund_score, Some(2.0));
        assert_eq!(positions[1].suggestion, Suggestion::Review);
        assert_eq!(positions[4].suggestion, Suggestion::Hold);
        assert_eq!(positions[0].suggestion, Suggestion::Hold);
    }

    #[test]
    fn test_suggest_rule() {
        let evaluator = PortfolioEvaluator::new();
        assert_eq!(evaluator.suggest(-15.0, Some(2.0), 2.6), Suggestion::Review);
        assert_eq!(evaluator.suggest(-15.0, Some(5.0), 2.6), Suggestion::Hold);
        assert_eq!(evaluator.suggest(-10.0, Some(1.0), 2.6), Suggestion::Hold);
        assert_eq!(evaluator.suggest(-50.0, None, 2.6), Suggestion::Hold);
    }

    #[test]
    fn test_cutoff_moves_with_composition() {
        let evaluator = PortfolioEvaluator::new();
        let scores: HashMap<String, f64> = [("LOW", 2.0), ("HIGH", 10.0), ("MID", 1.0)]
            .into_iter()
            .map(|(s, v)| (s.to_string(), v))
            .collect();

        // Alone with a stronger peer, LOW sits at the bottom: cutoff 2 + 0.4 * 8 = 5.2
        let mut two = vec![position("LOW", -20.0), position("HIGH", 0.0)];
        evaluator.assign_suggestions(&mut two, &scores);
        assert_eq!(two[0].suggestion, Suggestion::Review);

        // Adding a weaker peer lowers the cutoff below LOW's score: [1,2,10] -> 1.8
        let mut three = vec![position("LOW", -20.0), position("HIGH", 0.0), position("MID", 0.0)];
        evaluator.assign_suggestions(&mut three, &scores);
        assert_eq!(three[0].suggestion, Suggestion::Hold);
    }

    #[test]
    fn test_common_holdings_sorted() {
        let records = vec![
            SymbolRecord { symbol: "A".into(), roe: 1.0, debt: 0.0, sales_growth: 0.0, profit_growth: 0.0, fund_score: 1.0 },
            SymbolRecord { symbol: "B".into(), roe: 9.0, debt: 0.0, sales_growth: 0.0, profit_growth: 0.0, fund_score: 9.0 },
        ];
        let positions = vec![position("A", 0.0), position("B", 0.0), position("Z", 0.0)];
        let common = common_holdings(&positions, &records);
        assert_eq!(common.len(), 2);
        assert_eq!(common[0].symbol, "B");
        assert_eq!(common[1].symbol, "A");
    }

    #[test]
    fn test_summary() {
        let quotes: HashMap<_, _> = [quote("A", 120.0), quote("B", 90.0)].into_iter().collect();
        let positions = PortfolioEvaluator::new().evaluate(
            &[holding("A", 100.0, 10.0), holding("B", 100.0, 5.0)],
            &quotes,
            &HashMap::new(),
        );
        let summary = summarize(&positions);
        assert!((summary.total_value - 1650.0).abs() < 1e-9);
        assert!((summary.total_pnl - 150.0).abs() < 1e-9);
        assert_eq!(summary.win_rate, 50.0);
        assert_eq!(summary.best_symbol, "A");
    }

    #[test]
    fn test_summary_of_placeholder_only() {
        let summary = summarize(&[PortfolioPosition::placeholder()]);
        assert_eq!(summary.total_value, 0.0);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.best_symbol, "-");
    }
}
