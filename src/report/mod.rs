//! Report module - console summaries and exported model reports

pub mod model_report;
pub mod summary;

pub use model_report::*;
pub use summary::*;
