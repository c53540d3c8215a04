pub mod config;
pub mod dashboard;
pub mod fetcher;
pub mod offline;
pub mod pipeline;
pub mod ranker;
pub mod store;


pub use config::PipelineConfig;
pub use dashboard::DashboardData;
pub use fetcher::{BatchResult, FetchOutcome, SnapshotFetcher};
pub use pipeline::{Pipeline, RunReport};
pub use ranker::CompositeRanker;
pub use store::{OutputStore, OutputTables, StoredTables};
