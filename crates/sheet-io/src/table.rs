use analysis_core::AnalysisError;
use std::io::Read;
use std::path::Path;

use crate::columns::{canonicalize_header, ColumnSpec};
use crate::numeric::coerce_column;

/// An untyped input sheet with canonicalized headers.
#[derive(Debug, Clone)]
pub struct RawTable {
    name: String,
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

impl RawTable {
    /// Load a CSV export from disk.
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(&path.display().to_string(), file)
    }

    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, AnalysisError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()?
            .iter()
            .map(canonicalize_header)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(record);
        }

        tracing::debug!("Loaded {} rows from {}", rows.len(), name);

        Ok(Self {
            name: name.to_string(),
            headers,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column matching `spec`, if any.
    pub fn find(&self, spec: &ColumnSpec) -> Option<usize> {
        let header = spec.resolve(&self.headers)?;
        self.headers.iter().position(|h| h == header)
    }

    /// Like `find`, but absence is a hard failure for this sheet.
    pub fn require(&self, spec: &ColumnSpec) -> Result<usize, AnalysisError> {
        self.find(spec).ok_or_else(|| AnalysisError::MissingRequiredColumn {
            table: self.name.clone(),
            field: spec.field,
        })
    }

    /// Raw cell text of a column; short rows yield empty cells.
    pub fn text_column(&self, index: usize) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.get(index).unwrap_or(""))
            .collect()
    }

    /// Numeric column for `spec`. A missing optional column reads as all-missing.
    pub fn numeric_column(&self, spec: &ColumnSpec) -> Vec<Option<f64>> {
        match self.find(spec) {
            Some(index) => coerce_column(self.text_column(index)),
            None => {
                tracing::debug!("{}: no '{}' column, treating as missing", self.name, spec.field);
                vec![None; self.rows.len()]
            }
        }
    }
}
