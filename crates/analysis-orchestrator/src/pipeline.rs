use analysis_core::{
    normalize_symbol, ChangeBasis, MoverEntry, Quote, QuoteSource, RankedEntry, RunMode, SymbolRecord,
    TechnicalSignal,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fundamental_analysis::{fund_score_map, FundamentalScorer};
use polygon_client::PolygonClient;
use portfolio_manager::{load_holdings, Holding, PortfolioEvaluator, PortfolioPosition};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use technical_analysis::TechnicalSignalEngine;
use tokio::sync::Mutex;

use crate::config::PipelineConfig;
use crate::dashboard::DashboardData;
use crate::fetcher::SnapshotFetcher;
use crate::offline::{estimated_gainers, estimated_losers, estimated_momentum, or_placeholder};
use crate::ranker::CompositeRanker;
use crate::store::{OutputStore, OutputTables, StoredTables};

/// What one regeneration did and what went wrong along the way.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub fundamentals: usize,
    pub holdings: usize,
    pub quotes_fetched: usize,
    pub quotes_skipped: usize,
    pub histories_fetched: usize,
    pub histories_skipped: usize,
    pub signals: usize,
    pub signals_skipped: usize,
    pub issues: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            mode: RunMode::Offline,
            fundamentals: 0,
            holdings: 0,
            quotes_fetched: 0,
            quotes_skipped: 0,
            histories_fetched: 0,
            histories_skipped: 0,
            signals: 0,
            signals_skipped: 0,
            issues: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    fn issue(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.issues.push(message);
    }
}

/// Spreadsheet inputs of one pass. `holdings` is `None` when the portfolio
/// sheet could not be read or lacks its required columns.
struct Inputs {
    records: Vec<SymbolRecord>,
    holdings: Option<Vec<Holding>>,
}

impl Inputs {
    /// Fundamentals symbols first, then holdings not already listed.
    fn universe(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.symbol.clone())
            .chain(self.holdings.iter().flatten().map(|h| h.symbol.clone()))
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }
}

/// Load → normalize → fetch → score → rank → write, with the offline
/// fallback whenever live quotes are unavailable.
pub struct Pipeline {
    config: PipelineConfig,
    source: Option<Arc<dyn QuoteSource>>,
    scorer: FundamentalScorer,
    engine: TechnicalSignalEngine,
    ranker: CompositeRanker,
    evaluator: PortfolioEvaluator,
    fetcher: SnapshotFetcher,
    store: OutputStore,
    regenerating: Mutex<()>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, source: Option<Arc<dyn QuoteSource>>) -> Self {
        Self {
            scorer: FundamentalScorer::new(),
            engine: TechnicalSignalEngine::new(),
            ranker: CompositeRanker::new(config.top_n),
            evaluator: PortfolioEvaluator::new(),
            fetcher: SnapshotFetcher::new(config.quote_timeout, config.batch_deadline),
            store: OutputStore::new(config.output_dir.clone()),
            regenerating: Mutex::new(()),
            source,
            config,
        }
    }

    /// Polygon as the live source when an API key is configured.
    pub fn from_config(config: PipelineConfig) -> Self {
        let source = config.polygon_api_key.clone().map(|key| {
            Arc::new(PolygonClient::new(key, config.polygon_rate_limit, config.quote_timeout)) as Arc<dyn QuoteSource>
        });
        if source.is_none() {
            tracing::info!("POLYGON_API_KEY not set, running offline");
        }
        Self::new(config, source)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Run one full pass and replace the output tables.
    ///
    /// Only a failure to write the tables is an error; input and source
    /// problems are recorded in the report and degrade the run instead.
    pub async fn regenerate(&self) -> Result<RunReport> {
        let _running = self.regenerating.lock().await;
        let mut report = RunReport::new();
        let inputs = self.load_inputs(&mut report);

        let tables = match self.live_tables(&inputs, &mut report).await {
            Some(tables) => {
                report.mode = RunMode::Live;
                tables
            }
            None => {
                tracing::info!("Building offline estimates from {} fundamentals rows", inputs.records.len());
                report.mode = RunMode::Offline;
                self.offline_tables(&inputs)
            }
        };

        self.store
            .replace(&tables)
            .await
            .with_context(|| format!("writing output tables to {}", self.store.dir().display()))?;

        tracing::info!(
            "Regeneration finished ({}): {} gainers, {} losers, {} momentum, {} positions",
            report.mode,
            tables.gainers.len(),
            tables.losers.len(),
            tables.momentum.len(),
            tables.portfolio.len()
        );
        Ok(report)
    }

    /// Data for the dashboard page. Never fails: missing outputs are rebuilt
    /// offline and unreadable inputs yield placeholder rows.
    pub async fn dashboard_data(&self) -> DashboardData {
        let stored = match self.store.load().await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                tracing::info!("No complete outputs on disk, building offline tables");
                self.regenerate_offline().await
            }
            Err(e) => {
                tracing::warn!("Failed to read outputs: {}, building offline tables", e);
                self.regenerate_offline().await
            }
        };

        let fundamentals = match self.scorer.load(&self.config.fundamentals_path) {
            Ok(records) => Some(records),
            Err(e) => {
                tracing::warn!("Fundamentals unavailable for suggestions: {}", e);
                None
            }
        };

        DashboardData::assemble(stored, fundamentals.as_deref(), &self.evaluator, self.config.display_rows)
    }

    /// Offline tables for a dashboard read that found no outputs. A
    /// regeneration holding the lock may have written them meanwhile, so the
    /// store is checked again once the lock is ours.
    async fn regenerate_offline(&self) -> StoredTables {
        let _running = self.regenerating.lock().await;
        if let Ok(Some(stored)) = self.store.load().await {
            tracing::debug!("Outputs appeared while waiting, using them");
            return stored;
        }

        let mut report = RunReport::new();
        let inputs = self.load_inputs(&mut report);
        let tables = self.offline_tables(&inputs);

        if let Err(e) = self.store.replace(&tables).await {
            tracing::warn!("Could not persist offline tables: {}", e);
        }
        StoredTables {
            tables,
            written_at: report.generated_at,
        }
    }

    fn load_inputs(&self, report: &mut RunReport) -> Inputs {
        let records = match self.scorer.load(&self.config.fundamentals_path) {
            Ok(records) => records,
            Err(e) => {
                report.issue(format!("fundamentals {}: {}", self.config.fundamentals_path.display(), e));
                Vec::new()
            }
        };
        let holdings = match load_holdings(&self.config.portfolio_path) {
            Ok(holdings) => Some(holdings),
            Err(e) => {
                report.issue(format!("portfolio {}: {}", self.config.portfolio_path.display(), e));
                None
            }
        };

        report.fundamentals = records.len();
        report.holdings = holdings.as_ref().map_or(0, Vec::len);
        Inputs { records, holdings }
    }

    /// `None` means the run must fall back to offline estimates.
    async fn live_tables(&self, inputs: &Inputs, report: &mut RunReport) -> Option<OutputTables> {
        let Some(source) = self.source.as_deref() else {
            report.issue("no live quote source configured");
            return None;
        };
        if let Err(e) = source.probe().await {
            report.issue(e.to_string());
            return None;
        }

        let universe = inputs.universe();
        let deadline = self.fetcher.deadline();
        let quotes = self.fetcher.fetch_quotes(source, &universe, deadline).await;
        report.quotes_fetched = quotes.success_count();
        report.quotes_skipped = quotes.skip_count();
        if quotes.fetched.is_empty() {
            report.issue(format!("all {} quote fetches failed", universe.len()));
            return None;
        }

        // Symbols the source does not know are not worth a history request
        let quoted: Vec<String> = quotes.fetched.iter().map(|q| normalize_symbol(&q.symbol)).collect();
        let histories = self
            .fetcher
            .fetch_histories(source, &quoted, self.config.history_days, deadline)
            .await;
        report.histories_fetched = histories.success_count();
        report.histories_skipped = histories.skip_count();

        let mut signals: Vec<TechnicalSignal> = Vec::with_capacity(histories.fetched.len());
        for series in &histories.fetched {
            match self.engine.evaluate(series) {
                Ok(signal) => signals.push(signal),
                Err(e) => {
                    tracing::debug!("No signal for {}: {}", series.symbol, e);
                    report.signals_skipped += 1;
                }
            }
        }
        report.signals = signals.len();

        let fund_scores = fund_score_map(&inputs.records);
        let quote_map: HashMap<String, Quote> = quotes
            .fetched
            .iter()
            .map(|q| (normalize_symbol(&q.symbol), q.clone()))
            .collect();

        Some(OutputTables {
            gainers: or_placeholder(self.ranker.top_gainers(&quotes.fetched), || {
                MoverEntry::placeholder(ChangeBasis::Live)
            }),
            losers: or_placeholder(self.ranker.top_losers(&quotes.fetched), || {
                MoverEntry::placeholder(ChangeBasis::Live)
            }),
            momentum: or_placeholder(self.ranker.rank_momentum(&signals, &fund_scores), RankedEntry::placeholder),
            portfolio: self.portfolio_table(inputs, &quote_map, &fund_scores),
        })
    }

    fn offline_tables(&self, inputs: &Inputs) -> OutputTables {
        let top_n = self.ranker.top_n();
        let fund_scores = fund_score_map(&inputs.records);

        OutputTables {
            gainers: or_placeholder(estimated_gainers(&inputs.records, top_n), || {
                MoverEntry::placeholder(ChangeBasis::Estimate)
            }),
            losers: or_placeholder(estimated_losers(&inputs.records, top_n), || {
                MoverEntry::placeholder(ChangeBasis::Estimate)
            }),
            momentum: or_placeholder(estimated_momentum(&inputs.records, top_n), RankedEntry::placeholder),
            portfolio: self.portfolio_table(inputs, &HashMap::new(), &fund_scores),
        }
    }

    fn portfolio_table(
        &self,
        inputs: &Inputs,
        quotes: &HashMap<String, Quote>,
        fund_scores: &HashMap<String, f64>,
    ) -> Vec<PortfolioPosition> {
        let positions = match &inputs.holdings {
            Some(holdings) => self.evaluator.evaluate(holdings, quotes, fund_scores),
            None => Vec::new(),
        };
        or_placeholder(positions, PortfolioPosition::placeholder)
    }
}
