//! Lenient numeric parsing for spreadsheet cells.

/// Parse a currency/percent formatted cell.
///
/// Thousands separators and `%` are dropped, then every character outside
/// `[0-9.-]` is stripped. Returns `None` (missing, not zero) when nothing
/// parseable is left.
pub fn coerce_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce a whole column, preserving missing cells.
pub fn coerce_column<'a, I>(cells: I) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = &'a str>,
{
    cells.into_iter().map(coerce_number).collect()
}
