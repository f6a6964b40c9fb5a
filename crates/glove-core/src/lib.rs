//! Glove-Core: Foundation types for glove capture analysis
//!
//! Sample records, capture sessions, the error taxonomy, shared statistics
//! and the diagnostic reporting capability used by every analyzer.

pub mod capture;
pub mod error;
pub mod reporter;
pub mod sample;
pub mod stats;

pub use capture::{Capture, PairedChannels, DEFAULT_SAMPLING_RATE};
pub use error::{GloveError, GloveResult};
pub use reporter::{AnalysisReporter, CollectingReporter, ReportLevel, TracingReporter};
pub use sample::{Channel, MeasurementMode, Sample};
pub use stats::{ChannelStats, Correlation, LinearFit};
