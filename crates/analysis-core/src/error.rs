use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Missing required column '{field}' in {table}")]
    MissingRequiredColumn { table: String, field: &'static str },

    #[error("Insufficient history for {symbol}: need {needed} sessions, got {got}")]
    InsufficientHistory {
        symbol: String,
        needed: usize,
        got: usize,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Quote source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Why a single symbol dropped out of a fetch batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchFailure {
    #[error("symbol not found")]
    NotFound,

    #[error("missing field '{0}' in response")]
    MissingField(&'static str),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("cycle deadline exceeded before request")]
    DeadlineExceeded,
}

impl FetchFailure {
    /// Failures worth one immediate retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchFailure::Network(_) | FetchFailure::Timeout)
    }
}
