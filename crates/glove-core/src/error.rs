//! Error handling for the glove analysis core
//!
//! Every analysis entry point returns [`GloveResult`]. Callers treat
//! `InsufficientData` and `WrongMode` as declined operations, not faults.

use core::fmt;

/// Result type alias for glove analysis operations
pub type GloveResult<T> = Result<T, GloveError>;

/// Error type for all glove analysis operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum GloveError {
    /// Fewer samples than the operation needs
    InsufficientData {
        /// Operation that declined
        operation: &'static str,
        /// Minimum sample count
        required: usize,
        /// Samples actually available
        available: usize,
    },

    /// Analysis invoked on a capture recorded in another mode
    WrongMode {
        /// Operation that declined
        operation: &'static str,
        /// Mode the operation supports
        expected: &'static str,
        /// Mode of the capture
        actual: &'static str,
    },

    /// Filter design failure, near-zero division or NaN propagation
    NumericDegeneracy {
        /// Processing stage that degenerated
        stage: &'static str,
        /// Description of the cause
        reason: String,
    },

    /// Requested sensor channel is absent (legacy capture format)
    MissingChannel {
        /// Requested channel (1-based, as printed on the device)
        channel: usize,
        /// Number of channels the capture carries
        available: usize,
    },

    /// Force unit name not recognised
    UnknownUnit {
        /// Offending unit name
        unit: String,
    },

    /// Configuration rejected by validation
    InvalidConfig {
        /// Description of the configuration error
        reason: String,
    },

    /// Sample sequence violates the capture invariants
    InvalidCapture {
        /// Description of the violation
        reason: String,
    },
}

impl GloveError {
    /// True for errors that mean "not applicable" rather than "failed"
    pub fn is_declined(&self) -> bool {
        matches!(
            self,
            GloveError::InsufficientData { .. } | GloveError::WrongMode { .. }
        )
    }

    /// Shorthand for a numeric degeneracy at `stage`
    pub fn degenerate(stage: &'static str, reason: impl Into<String>) -> Self {
        GloveError::NumericDegeneracy {
            stage,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for GloveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GloveError::InsufficientData { operation, required, available } => {
                write!(f, "Not enough data for {}: need {} samples, have {}",
                       operation, required, available)
            }
            GloveError::WrongMode { operation, expected, actual } => {
                write!(f, "{} is only applicable for {} tests (capture mode: {})",
                       operation, expected, actual)
            }
            GloveError::NumericDegeneracy { stage, reason } => {
                write!(f, "Numeric degeneracy in {}: {}", stage, reason)
            }
            GloveError::MissingChannel { channel, available } => {
                write!(f, "Sensor channel {} unavailable: capture carries {} channels",
                       channel, available)
            }
            GloveError::UnknownUnit { unit } => {
                write!(f, "Unknown force unit '{}': expected kilograms-force, grams-force or newtons",
                       unit)
            }
            GloveError::InvalidConfig { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
            GloveError::InvalidCapture { reason } => {
                write!(f, "Invalid capture: {}", reason)
            }
        }
    }
}

impl std::error::Error for GloveError {}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::GloveError::InvalidConfig {
            reason: format!($($arg)*),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = GloveError::InsufficientData {
            operation: "tremor comparison",
            required: 50,
            available: 12,
        };
        let display = format!("{}", error);
        assert!(display.contains("tremor comparison"));
        assert!(display.contains("50"));
        assert!(display.contains("12"));
    }

    #[test]
    fn test_declined_classification() {
        let wrong_mode = GloveError::WrongMode {
            operation: "Force analysis",
            expected: "Stiffness",
            actual: "Tremor",
        };
        assert!(wrong_mode.is_declined());
        assert!(!GloveError::degenerate("bandpass", "too short").is_declined());
    }

    #[test]
    fn test_config_error_macro() {
        let error = config_error!("order must be even, got {}", 3);
        assert_eq!(
            error,
            GloveError::InvalidConfig { reason: "order must be even, got 3".to_string() }
        );
    }
}
