//! Immutable constant set shared by every engine component.
//!
//! Built once from a validated [`EngineConfig`] and handed around as
//! `Arc<EngineConstants>`. Nothing here is ever mutated after construction.

use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

use crate::config::EngineConfig;
use crate::error::ConfigError;

/// Golden ratio to 28 fractional digits.
const PHI_MANTISSA: i128 = 16_180_339_887_498_948_482_045_868_344;
/// `1 / sqrt(2)` to 28 fractional digits: the CHSH classical bound `2`
/// normalized by the Tsirelson bound `2 * sqrt(2)`.
const CLASSICAL_BOUND_MANTISSA: i128 = 7_071_067_811_865_475_244_008_443_621;
const CONSTANT_SCALE: u32 = 28;

/// Power of PHI whose inverse is the fidelity decay per hostile step.
const HOSTILE_DECAY_EXPONENT: u64 = 5;

#[derive(Debug, Clone)]
pub struct EngineConstants {
    phi: Decimal,
    resonance: Decimal,
    dimension_span: Decimal,
    admission_bound: Decimal,
    hostile_decay: Decimal,
    classical_bound: Decimal,
    precision: u32,
    guard_digits: u32,
    dimension_count: usize,
}

impl EngineConstants {
    /// Derive the constant set. The config must already be validated.
    ///
    /// Fails with [`ConfigError::ArithmeticOverflow`] when a derived power of
    /// PHI does not fit the decimal range, which means the dimension count
    /// itself is unusable.
    pub fn derive(config: &EngineConfig) -> Result<Self, ConfigError> {
        let phi = Decimal::from_i128_with_scale(PHI_MANTISSA, CONSTANT_SCALE);
        let classical_bound =
            Decimal::from_i128_with_scale(CLASSICAL_BOUND_MANTISSA, CONSTANT_SCALE);

        let exponent = u64::try_from(config.dimension_count).map_err(|_| {
            ConfigError::ArithmeticOverflow(format!(
                "dimension count {} does not fit a u64 exponent",
                config.dimension_count
            ))
        })?;
        let dimension_span = phi.checked_powu(exponent).ok_or_else(|| {
            ConfigError::ArithmeticOverflow(format!(
                "PHI^{} exceeds the decimal range",
                config.dimension_count
            ))
        })?;

        // Largest magnitude that still carries every noise digit with a full
        // noise step of headroom in the 96-bit mantissa.
        let carry = Decimal::MAX.mantissa() - i128::from(config.noise_amplitude);
        let admission_bound = Decimal::try_from_i128_with_scale(carry, config.noise_scale())
            .map_err(|e| ConfigError::ArithmeticOverflow(format!("noise carry bound: {}", e)))?
            .round_dp_with_strategy(config.precision, RoundingStrategy::ToZero)
            .min(dimension_span);

        let hostile_decay = phi
            .checked_powu(HOSTILE_DECAY_EXPONENT)
            .and_then(|p| Decimal::ONE.checked_div(p))
            .ok_or_else(|| ConfigError::ArithmeticOverflow("PHI^-5".to_string()))?;

        Ok(Self {
            phi,
            resonance: config.resonance_constant,
            dimension_span,
            admission_bound,
            hostile_decay,
            classical_bound,
            precision: config.precision,
            guard_digits: config.guard_digits,
            dimension_count: config.dimension_count,
        })
    }

    pub fn phi(&self) -> Decimal {
        self.phi
    }

    pub fn resonance(&self) -> Decimal {
        self.resonance
    }

    /// `PHI^dimension_count`, the upper edge of the valid magnitude range.
    pub fn dimension_span(&self) -> Decimal {
        self.dimension_span
    }

    /// Upper edge for external magnitudes: within the span and small enough
    /// that noise at `10^-(P+G)` stays representable.
    pub fn admission_bound(&self) -> Decimal {
        self.admission_bound
    }

    /// Fidelity multiplier applied per hostile step (`PHI^-5`, just under 0.1).
    pub fn hostile_decay(&self) -> Decimal {
        self.hostile_decay
    }

    pub fn classical_bound(&self) -> Decimal {
        self.classical_bound
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn guard_digits(&self) -> u32 {
        self.guard_digits
    }

    pub fn dimension_count(&self) -> usize {
        self.dimension_count
    }

    /// Fractional digits of PHI, most significant first.
    pub fn phi_digits(&self) -> Vec<u8> {
        self.phi
            .fract()
            .mantissa()
            .to_string()
            .bytes()
            .map(|b| b - b'0')
            .collect()
    }
}
