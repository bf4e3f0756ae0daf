//! Observability utilities.

mod logging;
mod spans;
mod summary;

pub use logging::{init_logging, LogFormat, DEFAULT_FILTER};
pub use spans::SpanTimer;
pub use summary::ExtractionSummary;
