pub mod candle;
pub mod directory;
pub mod error;
pub mod indicators;
pub mod insights;
pub mod metrics;
pub mod report;
pub mod schema;
pub mod snapshot;
pub mod stats;
pub mod window;
