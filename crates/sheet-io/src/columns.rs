//! Header canonicalization and alias resolution.

/// A canonical field and the headers that may carry it, highest priority first.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub aliases: &'static [&'static str],
}

impl ColumnSpec {
    pub const fn new(field: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { field, aliases }
    }

    /// First alias present in `headers` (which must already be canonical).
    pub fn resolve<'a>(&self, headers: &'a [String]) -> Option<&'a str> {
        resolve_column(headers, self.aliases)
    }
}

/// Lowercase, collapse every run of non-alphanumeric characters to a single
/// space, trim. "ROE %", "roe%" and " ROE  %" all become "roe".
pub fn canonicalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Return the first alias (canonicalized) that appears in `headers`.
pub fn resolve_column<'a>(headers: &'a [String], aliases: &[&str]) -> Option<&'a str> {
    aliases.iter().find_map(|alias| {
        let wanted = canonicalize_header(alias);
        headers.iter().find(|h| **h == wanted).map(String::as_str)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(headers: &[&str]) -> Vec<String> {
        headers.iter().map(|h| canonicalize_header(h)).collect()
    }

    #[test]
    fn test_canonicalize_header() {
        assert_eq!(canonicalize_header("ROE %"), "roe");
        assert_eq!(canonicalize_header("roe%"), "roe");
        assert_eq!(canonicalize_header(" ROE  %"), "roe");
        assert_eq!(canonicalize_header("Debt / Eq"), "debt eq");
        assert_eq!(canonicalize_header("P&L"), "p l");
        assert_eq!(canonicalize_header("Sales\u{a0}Var 3Yrs %"), "sales var 3yrs");
        assert_eq!(canonicalize_header("  "), "");
    }

    #[test]
    fn test_variants_resolve_to_same_field() {
        let roe = ColumnSpec::new("roe", &["roe %", "roe"]);
        for variant in ["ROE %", "roe%", " ROE  %", "Roe"] {
            let headers = canon(&["Name", variant, "Debt / Eq"]);
            assert_eq!(roe.resolve(&headers), Some("roe"), "variant {:?}", variant);
        }
    }

    #[test]
    fn test_priority_order() {
        let headers = canon(&["Profit Growth", "Qtr Profit Var %"]);
        let profit = resolve_column(&headers, &["qtr profit var %", "profit growth 3years", "profit growth"]);
        assert_eq!(profit, Some("qtr profit var"));
    }

    #[test]
    fn test_missing_column_is_none() {
        let headers = canon(&["Name", "ROE %"]);
        assert_eq!(resolve_column(&headers, &["debt / eq", "debt"]), None);
    }
}
