pub mod holdings;
pub mod models;
pub mod portfolio;

pub use holdings::load_holdings;
pub use models::*;
pub use portfolio::{common_holdings, pnl_pct, summarize, PortfolioEvaluator};
