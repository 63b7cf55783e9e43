//! Patline Core - Common infrastructure for bulk patent data pipelines
//!
//! This crate provides the reusable pieces under the corpus builder:
//! HTTP streaming, record cursor over dump files, output sinks, logging
//! and progress reporting.

pub mod dump;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod sink;
pub mod stream;

// Re-exports for convenience
pub use dump::DumpReader;
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use sink::{CorpusSink, SingleFileSink, ZipSink};
pub use stream::{SHARED_RUNTIME, StreamError, download_to_file, fetch_text, http_client};
