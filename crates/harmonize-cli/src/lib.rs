//! CLI library components for the harmonize engine.

pub mod logging;
pub mod output;
pub mod report;
