use analysis_core::{AnalysisError, MoverEntry, RankedEntry};
use chrono::{DateTime, Utc};
use portfolio_manager::PortfolioPosition;
use sheet_io::{read_table, stage_table};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

pub const GAINERS_FILE: &str = "top_gainers.csv";
pub const LOSERS_FILE: &str = "top_losers.csv";
pub const MOMENTUM_FILE: &str = "potential_stocks.csv";
pub const PORTFOLIO_FILE: &str = "portfolio_performance.csv";

/// The four tables produced by one regeneration.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTables {
    pub gainers: Vec<MoverEntry>,
    pub losers: Vec<MoverEntry>,
    pub momentum: Vec<RankedEntry>,
    pub portfolio: Vec<PortfolioPosition>,
}

/// Tables as last committed, with the time they were written.
#[derive(Debug, Clone)]
pub struct StoredTables {
    pub tables: OutputTables,
    pub written_at: DateTime<Utc>,
}

/// Output directory guarded by a process-wide lock. Writers stage every
/// table before committing any, and readers never interleave with a commit.
pub struct OutputStore {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn replace(&self, tables: &OutputTables) -> Result<(), AnalysisError> {
        let _guard = self.lock.write().await;

        let staged = vec![
            stage_table(&self.dir.join(GAINERS_FILE), &tables.gainers)?,
            stage_table(&self.dir.join(LOSERS_FILE), &tables.losers)?,
            stage_table(&self.dir.join(MOMENTUM_FILE), &tables.momentum)?,
            stage_table(&self.dir.join(PORTFOLIO_FILE), &tables.portfolio)?,
        ];
        for table in staged {
            tracing::debug!("Committing {}", table.target().display());
            table.commit()?;
        }

        tracing::info!("Wrote output tables to {}", self.dir.display());
        Ok(())
    }

    /// `Ok(None)` when any of the four files is missing.
    pub async fn load(&self) -> Result<Option<StoredTables>, AnalysisError> {
        let _guard = self.lock.read().await;

        let paths = [GAINERS_FILE, LOSERS_FILE, MOMENTUM_FILE, PORTFOLIO_FILE].map(|f| self.dir.join(f));
        if let Some(missing) = paths.iter().find(|p| !p.exists()) {
            tracing::debug!("Output table {} is missing", missing.display());
            return Ok(None);
        }

        let written_at = std::fs::metadata(&paths[3])?.modified()?;
        let tables = OutputTables {
            gainers: read_table(&paths[0])?,
            losers: read_table(&paths[1])?,
            momentum: read_table(&paths[2])?,
            portfolio: read_table(&paths[3])?,
        };

        Ok(Some(StoredTables {
            tables,
            written_at: DateTime::<Utc>::from(written_at),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{ChangeBasis, Signal};

    fn sample() -> OutputTables {
        OutputTables {
            gainers: vec![MoverEntry {
                symbol: "UP".to_string(),
                price: Some(110.0),
                volume: Some(5000.0),
                pct_change: 10.0,
                basis: ChangeBasis::Live,
            }],
            losers: vec![MoverEntry::placeholder(ChangeBasis::Live)],
            momentum: vec![RankedEntry {
                symbol: "HOT".to_string(),
                price: Some(50.5),
                rsi: Some(81.25),
                signal: Signal::Sell,
                tech_score: 82.5,
                fund_score: None,
                final_score: 49.5,
            }],
            portfolio: vec![PortfolioPosition::placeholder()],
        }
    }

    #[tokio::test]
    async fn test_read_returns_what_was_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let tables = sample();

        store.replace(&tables).await.unwrap();
        let stored = store.load().await.unwrap().unwrap();
        assert_eq!(stored.tables, tables);
    }

    #[tokio::test]
    async fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        assert!(store.load().await.unwrap().is_none());

        store.replace(&sample()).await.unwrap();
        std::fs::remove_file(dir.path().join(MOMENTUM_FILE)).unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("out"));
        store.replace(&sample()).await.unwrap();

        let mut second = sample();
        second.gainers.clear();
        second.gainers.push(MoverEntry::placeholder(ChangeBasis::Estimate));
        store.replace(&second).await.unwrap();

        let stored = store.load().await.unwrap().unwrap();
        assert_eq!(stored.tables.gainers[0].basis, ChangeBasis::Estimate);
        assert_eq!(stored.tables.momentum[0].symbol, "HOT");
    }
}
