//! Error types for the integrity engine.
//!
//! Hostile but well-formed inputs never produce errors: they degrade into
//! low fidelity, low correlation or failed validation. Errors are reserved
//! for inputs outside the engine's domain and for invalid configuration.

use rust_decimal::Decimal;
use thiserror::Error;

/// Caller supplied a value outside the engine's domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Dimension index {index} out of range (dimensions: {dimensions})")]
    DimensionOutOfRange { index: usize, dimensions: usize },

    #[error("Non-finite magnitude: {0}")]
    NonFiniteMagnitude(String),

    #[error("Malformed magnitude: {0}")]
    MalformedMagnitude(String),

    #[error("Magnitude {magnitude} outside valid range (0, {max}]")]
    MagnitudeOutOfBounds { magnitude: Decimal, max: Decimal },

    #[error("Precision mismatch: engine uses {expected} digits, input carries {actual}")]
    PrecisionMismatch { expected: u32, actual: u32 },
}

impl InputError {
    /// Returns true if the rejected input looks like a forgery attempt
    /// rather than a plain caller mistake.
    pub fn is_security_concern(&self) -> bool {
        matches!(
            self,
            Self::PrecisionMismatch { .. } | Self::MagnitudeOutOfBounds { .. }
        )
    }
}

/// Invalid engine configuration. Fatal at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Precision {requested} below minimum {min}")]
    PrecisionTooLow { requested: u32, min: u32 },

    #[error("Precision {requested} plus guard digits exceeds the decimal scale limit {max}")]
    PrecisionExceeded { requested: u32, max: u32 },

    #[error("Guard digits must be between 1 and {max}, got {requested}")]
    InvalidGuardDigits { requested: u32, max: u32 },

    #[error("Noise amplitude {amplitude} must be in 1..={max} for the configured guard digits")]
    NoiseOutOfBounds { amplitude: u32, max: u32 },

    #[error("Dimension count must be positive")]
    InvalidDimensionCount,

    #[error("Resonance constant must be positive, got {0}")]
    InvalidResonance(Decimal),

    #[error("History capacity must be positive")]
    InvalidHistoryCapacity,

    #[error("Arithmetic overflow while deriving constants: {0}")]
    ArithmeticOverflow(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to read config file: {0}")]
    Io(String),
}

/// Hash chain verification failure in the history ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Hash chain mismatch at sequence {sequence}")]
    ChainMismatch { sequence: u64 },

    #[error("Entry hash mismatch at sequence {sequence}")]
    EntryHashMismatch { sequence: u64 },

    #[error("Entry serialization failed: {0}")]
    Serialization(String),
}
