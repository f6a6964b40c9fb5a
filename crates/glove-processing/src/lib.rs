//! Glove-Processing: Analysis core for Parkinson's glove captures
//!
//! Signal conditioning, spectral and kinematic analysis, extrema detection,
//! cross-sensor comparison and force conversion, dispatched per measurement
//! mode by the [`SessionAnalyzer`].

pub mod analyzer;
pub mod bradykinesia;
pub mod config;
pub mod extrema;
pub mod filters;
pub mod force;
pub mod kinematics;
pub mod movement;
pub mod smoothing;
pub mod spectrum;
pub mod tremor;

pub use analyzer::{
    AnalysisMetrics, AnalysisOutcome, AnalysisRequest, BradykinesiaReport, FrequencyReport, SessionAnalyzer,
    SessionReport,
};
pub use bradykinesia::{normalize_angle, AngleComparator, AngleComparison, AngleInterpretation};
pub use config::{
    AnalysisConfig, ComparisonSettings, ExtremaSettings, FilterSettings, ForceCalibration, KinematicSettings,
    MovementSettings, SpectralSettings,
};
pub use extrema::{find_extrema, find_peaks, peak_to_trough_distance, ExtremaSet, Extremum, ExtremumKind, PeakCriteria};
pub use filters::{bandpass, remove_dc, ButterworthBandpass};
pub use force::{ForceAnalyzer, ForceReport, ForceTransducer, ForceUnit};
pub use kinematics::{integrate_to_displacement, try_integrate_band_limited, AmplitudeSeries, DisplacementTrace};
pub use movement::{MovementAnalyzer, MovementReport};
pub use spectrum::{analyze_frequency, classify_tremor, FrequencySpectrum, TremorClass, TREMOR_RULES};
pub use tremor::{AgreementLevel, TremorComparator, TremorComparison};
