//! Run orchestration and configuration.

pub mod collector;
pub mod config_loader;

// Re-export key types
pub use collector::{AreaCollector, RowStore, RunSummary};
pub use config_loader::ScraperConfig;
