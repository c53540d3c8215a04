use analysis_core::{normalize_symbol, AnalysisError};
use sheet_io::{ColumnSpec, RawTable};
use std::path::Path;

use crate::models::Holding;

pub const SYMBOL_COLUMN: ColumnSpec = ColumnSpec::new("symbol", &["symbol", "name", "stock", "instrument"]);
pub const ENTRY_COLUMN: ColumnSpec = ColumnSpec::new("entry_price", &["entry price", "entry", "buy price", "avg cost"]);
pub const QUANTITY_COLUMN: ColumnSpec = ColumnSpec::new("quantity", &["quantity", "qty"]);
pub const CURRENT_COLUMN: ColumnSpec = ColumnSpec::new("current", &["ltp", "current", "cur val"]);
pub const PNL_COLUMN: ColumnSpec = ColumnSpec::new("pnl", &["p&l", "pnl"]);

/// Load holdings from a portfolio CSV export.
pub fn load_holdings(path: &Path) -> Result<Vec<Holding>, AnalysisError> {
    let table = RawTable::from_path(path)?;
    holdings_from_table(&table)
}

/// Symbol, entry price and quantity are required; current price and P&L are
/// picked up when present. Unparsable entry/quantity cells read as zero.
pub fn holdings_from_table(table: &RawTable) -> Result<Vec<Holding>, AnalysisError> {
    let symbol_idx = table.require(&SYMBOL_COLUMN)?;
    table.require(&ENTRY_COLUMN)?;
    table.require(&QUANTITY_COLUMN)?;

    let symbols = table.text_column(symbol_idx);
    let entries = table.numeric_column(&ENTRY_COLUMN);
    let quantities = table.numeric_column(&QUANTITY_COLUMN);
    let current = table.numeric_column(&CURRENT_COLUMN);
    let pnl = table.numeric_column(&PNL_COLUMN);

    let holdings: Vec<Holding> = symbols
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| {
            let symbol = normalize_symbol(raw);
            if symbol.is_empty() {
                return None;
            }
            Some(Holding {
                symbol,
                entry_price: entries[i].unwrap_or(0.0),
                quantity: quantities[i].unwrap_or(0.0),
                last_price: current[i],
                reported_pnl: pnl[i],
            })
        })
        .collect();

    tracing::info!("Loaded {} holdings from {}", holdings.len(), table.name());
    Ok(holdings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader("portfolio", csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_basic_holdings() {
        let csv = "Symbol,Entry Price,Quantity\ninfy ,1500,10\nTCS,\"3,200.50\",5\n";
        let holdings = holdings_from_table(&table(csv)).unwrap();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].symbol, "INFY");
        assert_eq!(holdings[1].entry_price, 3200.5);
        assert_eq!(holdings[1].last_price, None);
        assert_eq!(holdings[1].reported_pnl, None);
    }

    #[test]
    fn test_broker_export_aliases() {
        let csv = "Instrument,Qty.,Avg. cost,LTP,P&L\nHDFCBANK,4,1600,1650,200\n";
        let holdings = holdings_from_table(&table(csv)).unwrap();
        assert_eq!(holdings[0].symbol, "HDFCBANK");
        assert_eq!(holdings[0].quantity, 4.0);
        assert_eq!(holdings[0].entry_price, 1600.0);
        assert_eq!(holdings[0].last_price, Some(1650.0));
        assert_eq!(holdings[0].reported_pnl, Some(200.0));
    }

    #[test]
    fn test_missing_quantity_column_fails() {
        let csv = "Symbol,Entry Price\nINFY,1500\n";
        let err = holdings_from_table(&table(csv)).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingRequiredColumn { field: "quantity", .. }));
    }

    #[test]
    fn test_blank_symbols_skipped() {
        let csv = "Symbol,Entry,Qty\n,100,1\nABC,10,1\n";
        let holdings = holdings_from_table(&table(csv)).unwrap();
        assert_eq!(holdings.len(), 1);
    }
}
