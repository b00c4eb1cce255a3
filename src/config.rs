//! Engine configuration loading and validation.
//!
//! Configuration can come from `KILLSWITCH_*` environment variables, from a
//! TOML document, or be built in code. Env and TOML loading never panic:
//! missing or unparsable env values fall back to defaults. Semantic checks
//! happen in [`EngineConfig::validate`], which the engine runs at
//! construction.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `KILLSWITCH_PRECISION` | 24 | Fractional digits of token magnitudes (P) |
//! | `KILLSWITCH_GUARD_DIGITS` | 4 | Digits below P reserved for noise (G) |
//! | `KILLSWITCH_RESONANCE` | 432 | Secondary scaling constant |
//! | `KILLSWITCH_DIMENSIONS` | 75 | Number of entanglement dimensions |
//! | `KILLSWITCH_HISTORY_CAPACITY` | 4096 | Ring buffer size of the history ledger |
//! | `KILLSWITCH_NOISE_AMPLITUDE` | 50 | Max noise step in units of 10^-(P+G) |
//! | `KILLSWITCH_AUDIT_MEASUREMENTS` | false | Record measurements in the ledger |

use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest decimal scale representable by the magnitude type.
pub const MAX_SCALE: u32 = 28;
/// Smallest precision at which certificates and uniqueness are certain.
pub const MIN_PRECISION: u32 = 22;
/// Coherence floor every unmutated valid token must exceed.
pub const COHERENCE_THRESHOLD: u32 = 150;
/// Largest partial quotient tolerated before a magnitude counts as near-rational.
pub const MAX_PARTIAL_QUOTIENT: u128 = 64;

const DEFAULT_PRECISION: u32 = 24;
const DEFAULT_GUARD_DIGITS: u32 = 4;
const DEFAULT_RESONANCE: i64 = 432;
const DEFAULT_DIMENSIONS: usize = 75;
const DEFAULT_HISTORY_CAPACITY: usize = 4096;
const DEFAULT_NOISE_AMPLITUDE: u32 = 50;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fractional decimal digits carried by generated magnitudes.
    pub precision: u32,
    /// Digits below `precision` where environmental noise lives.
    pub guard_digits: u32,
    /// Secondary scaling constant.
    pub resonance_constant: Decimal,
    /// Number of entanglement dimensions (basis constants).
    pub dimension_count: usize,
    /// Maximum retained history entries.
    pub history_capacity: usize,
    /// Maximum noise step, in units of `10^-(precision + guard_digits)`.
    pub noise_amplitude: u32,
    /// Append a ledger entry for every `measure_state` call.
    pub audit_measurements: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            guard_digits: DEFAULT_GUARD_DIGITS,
            resonance_constant: Decimal::from(DEFAULT_RESONANCE),
            dimension_count: DEFAULT_DIMENSIONS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            noise_amplitude: DEFAULT_NOISE_AMPLITUDE,
            audit_measurements: false,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&source)
    }

    /// Total decimal scale used by noised magnitudes.
    pub fn noise_scale(&self) -> u32 {
        self.precision + self.guard_digits
    }

    /// Check every option and the combinations between them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.precision < MIN_PRECISION {
            return Err(ConfigError::PrecisionTooLow {
                requested: self.precision,
                min: MIN_PRECISION,
            });
        }
        if self.precision >= MAX_SCALE {
            return Err(ConfigError::PrecisionExceeded {
                requested: self.precision,
                max: MAX_SCALE,
            });
        }
        let max_guard = MAX_SCALE - self.precision;
        if self.guard_digits == 0 || self.guard_digits > max_guard {
            return Err(ConfigError::InvalidGuardDigits {
                requested: self.guard_digits,
                max: max_guard,
            });
        }

        let max_amplitude = max_noise_amplitude(self.guard_digits);
        if max_amplitude == 0 {
            return Err(ConfigError::InvalidGuardDigits {
                requested: self.guard_digits,
                max: max_guard,
            });
        }
        if self.noise_amplitude == 0 || self.noise_amplitude > max_amplitude {
            return Err(ConfigError::NoiseOutOfBounds {
                amplitude: self.noise_amplitude,
                max: max_amplitude,
            });
        }

        if self.dimension_count == 0 {
            return Err(ConfigError::InvalidDimensionCount);
        }
        if self.resonance_constant <= Decimal::ZERO {
            return Err(ConfigError::InvalidResonance(self.resonance_constant));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::InvalidHistoryCapacity);
        }
        Ok(())
    }
}

/// Correction radius in noise units: half of one unit at `precision`.
pub(crate) fn correction_radius(guard_digits: u32) -> u128 {
    10u128.pow(guard_digits) / 2
}

/// Largest noise amplitude whose drift budget keeps the worst admissible
/// token above [`COHERENCE_THRESHOLD`].
///
/// The budget is `3 R^2 / (A (A + 1))` rounds and the worst certified
/// margin is `1 / MAX_PARTIAL_QUOTIENT`, so `A (A + 1)` must stay below
/// `R^2 / (THRESHOLD * MAX_PARTIAL_QUOTIENT / 3)`.
pub fn max_noise_amplitude(guard_digits: u32) -> u32 {
    if guard_digits == 0 || guard_digits > MAX_SCALE - MIN_PRECISION {
        return 0;
    }
    let radius = correction_radius(guard_digits);
    let limit = radius * radius * 3;
    let floor = u128::from(COHERENCE_THRESHOLD) * MAX_PARTIAL_QUOTIENT;

    let mut amplitude: u128 = 0;
    while (amplitude + 1) * (amplitude + 2) * floor < limit {
        amplitude += 1;
    }
    u32::try_from(amplitude).unwrap_or(u32::MAX)
}

/// Parse a `u32` env var, returning `default` on missing or invalid.
fn parse_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u32>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn parse_decimal(key: &str, default: Decimal) -> Decimal {
    match std::env::var(key) {
        Ok(val) => Decimal::from_str(val.trim()).unwrap_or(default),
        Err(_) => default,
    }
}

/// Load configuration from environment variables.
///
/// Missing or invalid values fall back to defaults without panicking.
/// Counts are floored at 1; the result still goes through
/// [`EngineConfig::validate`] when an engine is built from it.
pub fn load() -> EngineConfig {
    let defaults = EngineConfig::default();
    let dimension_count = parse_usize("KILLSWITCH_DIMENSIONS", defaults.dimension_count).max(1);
    let history_capacity =
        parse_usize("KILLSWITCH_HISTORY_CAPACITY", defaults.history_capacity).max(1);

    EngineConfig {
        precision: parse_u32("KILLSWITCH_PRECISION", defaults.precision),
        guard_digits: parse_u32("KILLSWITCH_GUARD_DIGITS", defaults.guard_digits),
        resonance_constant: parse_decimal("KILLSWITCH_RESONANCE", defaults.resonance_constant),
        dimension_count,
        history_capacity,
        noise_amplitude: parse_u32("KILLSWITCH_NOISE_AMPLITUDE", defaults.noise_amplitude),
        audit_measurements: parse_bool(
            "KILLSWITCH_AUDIT_MEASUREMENTS",
            defaults.audit_measurements,
        ),
    }
}
