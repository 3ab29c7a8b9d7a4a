//! The keyword collection loop: search, dedupe, comment scan, persist,
//! summarize, checkpoint, throttle.

mod collector;
mod config;
mod report;

pub use collector::Collector;
pub use config::CollectorConfig;
pub use report::{KeywordReport, RunReport};
