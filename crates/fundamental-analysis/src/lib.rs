use analysis_core::{normalize_symbol, AnalysisError, SymbolRecord};
use sheet_io::{ColumnSpec, RawTable};
use std::collections::HashMap;
use std::path::Path;

pub const SYMBOL_COLUMN: ColumnSpec = ColumnSpec::new("symbol", &["name", "company", "symbol"]);
pub const ROE_COLUMN: ColumnSpec = ColumnSpec::new("roe", &["roe %", "roe"]);
pub const DEBT_COLUMN: ColumnSpec = ColumnSpec::new("debt", &["debt / eq", "debt equity", "debt"]);
pub const SALES_GROWTH_COLUMN: ColumnSpec = ColumnSpec::new(
    "sales_growth",
    &["sales var 3yrs %", "sales growth 3yrs %", "sales growth"],
);
pub const PROFIT_GROWTH_COLUMN: ColumnSpec = ColumnSpec::new(
    "profit_growth",
    &["qtr profit var %", "profit growth 3years", "profit growth"],
);

/// Weights of the fundamental composite
#[derive(Debug, Clone)]
pub struct FundamentalWeights {
    pub roe: f64,
    pub sales_growth: f64,
    pub profit_growth: f64,
    /// Subtracted: more leverage lowers the score
    pub debt: f64,
}

impl Default for FundamentalWeights {
    fn default() -> Self {
        Self {
            roe: 0.35,
            sales_growth: 0.25,
            profit_growth: 0.25,
            debt: 0.15,
        }
    }
}

/// Scores fundamentals spreadsheets into `SymbolRecord`s.
pub struct FundamentalScorer {
    weights: FundamentalWeights,
}

impl Default for FundamentalScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl FundamentalScorer {
    pub fn new() -> Self {
        Self {
            weights: FundamentalWeights::default(),
        }
    }

    pub fn with_weights(weights: FundamentalWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, roe: f64, debt: f64, sales_growth: f64, profit_growth: f64) -> f64 {
        roe * self.weights.roe + sales_growth * self.weights.sales_growth
            + profit_growth * self.weights.profit_growth
            - debt * self.weights.debt
    }

    pub fn record(&self, symbol: String, roe: f64, debt: f64, sales_growth: f64, profit_growth: f64) -> SymbolRecord {
        SymbolRecord {
            fund_score: self.score(roe, debt, sales_growth, profit_growth),
            symbol,
            roe,
            debt,
            sales_growth,
            profit_growth,
        }
    }

    /// Load and score a fundamentals CSV export.
    pub fn load(&self, path: &Path) -> Result<Vec<SymbolRecord>, AnalysisError> {
        let table = RawTable::from_path(path)?;
        self.score_table(&table)
    }

    /// Score every row of a fundamentals sheet.
    ///
    /// The identity column is mandatory; numeric columns may be absent and
    /// unparsable cells are zero-filled. Leaked header rows ("name") and blank
    /// identities are dropped. Duplicate symbols: the last row wins and takes
    /// the position of the first occurrence.
    pub fn score_table(&self, table: &RawTable) -> Result<Vec<SymbolRecord>, AnalysisError> {
        let symbol_idx = table.require(&SYMBOL_COLUMN)?;
        let names = table.text_column(symbol_idx);
        let roe = table.numeric_column(&ROE_COLUMN);
        let debt = table.numeric_column(&DEBT_COLUMN);
        let sales = table.numeric_column(&SALES_GROWTH_COLUMN);
        let profit = table.numeric_column(&PROFIT_GROWTH_COLUMN);

        let mut records: Vec<SymbolRecord> = Vec::with_capacity(names.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut duplicates = 0usize;

        for (i, name) in names.iter().enumerate() {
            let symbol = normalize_symbol(name);
            if symbol.is_empty() || symbol.eq_ignore_ascii_case("name") {
                continue;
            }

            let record = self.record(
                symbol.clone(),
                roe[i].unwrap_or(0.0),
                debt[i].unwrap_or(0.0),
                sales[i].unwrap_or(0.0),
                profit[i].unwrap_or(0.0),
            );

            match index.get(&symbol) {
                Some(&pos) => {
                    duplicates += 1;
                    records[pos] = record;
                }
                None => {
                    index.insert(symbol, records.len());
                    records.push(record);
                }
            }
        }

        if duplicates > 0 {
            tracing::warn!("{}: {} duplicate symbols, keeping the last row of each", table.name(), duplicates);
        }
        tracing::info!("Scored {} fundamentals rows from {}", records.len(), table.name());

        Ok(records)
    }
}

/// fund_score by symbol
pub fn fund_score_map(records: &[SymbolRecord]) -> HashMap<String, f64> {
    records
        .iter()
        .map(|r| (r.symbol.clone(), r.fund_score))
        .collect()
}
