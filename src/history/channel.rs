//! Environmental noise, error correction and collapse readings.
//!
//! Noise lives strictly below the token precision: one step moves a
//! magnitude by at most `noise_amplitude` units of `10^-(P+G)`, which is
//! always less than half a unit at precision P. Correction rounds back to P
//! digits, so it exactly cancels bounded noise and does nothing useful for a
//! token that was scaled or squared.
//!
//! Admission keeps every legitimate magnitude small enough to carry
//! `10^-(P+G)`. Hostile derivations can grow past that; their noise step
//! falls back to the finest unit the magnitude can still hold, so noise is
//! never silently rounded away.

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::constants::EngineConstants;
use crate::token::{Token, TransformKind};

#[derive(Debug, Clone)]
pub struct EnvironmentChannel {
    constants: Arc<EngineConstants>,
    noise_amplitude: u32,
}

impl EnvironmentChannel {
    pub fn new(constants: Arc<EngineConstants>, noise_amplitude: u32) -> Self {
        Self {
            constants,
            noise_amplitude: noise_amplitude.max(1),
        }
    }

    /// Non-zero perturbation in noise units, drawn from `word`.
    fn offset(&self, word: u64) -> i64 {
        let amplitude = u64::from(self.noise_amplitude);
        let v = word % (2 * amplitude);
        if v < amplitude {
            -((v + 1) as i64)
        } else {
            (v - amplitude + 1) as i64
        }
    }

    /// Perturb `token` by a bounded, non-zero amount.
    ///
    /// The step is `offset * 10^-s` for the largest `s <= P+G` at which the
    /// sum is exact. Only a magnitude at the edge of the decimal range, where
    /// no unit fits, comes back unchanged and flagged saturated.
    pub fn perturb(&self, token: &Token, word: u64) -> Token {
        let offset = self.offset(word);
        let magnitude = token.magnitude();
        let finest = self.constants.precision() + self.constants.guard_digits();
        for scale in (0..=finest).rev() {
            let delta = Decimal::new(offset, scale);
            match magnitude.checked_add(delta) {
                Some(noised) if noised.checked_sub(magnitude) == Some(delta) => {
                    if scale < finest {
                        tracing::debug!(scale, %magnitude, "noise unit coarsened");
                    }
                    return token.derive(noised, TransformKind::Noise, false);
                }
                Some(_) => continue,
                None => break,
            }
        }
        token.derive(magnitude, TransformKind::Noise, true)
    }

    /// Round back to the token precision.
    pub fn correct(&self, token: &Token) -> Token {
        let corrected = token
            .magnitude()
            .round_dp_with_strategy(self.constants.precision(), RoundingStrategy::MidpointNearestEven);
        token.derive(corrected, TransformKind::Correction, false)
    }

    /// Collapse reading: the phase `frac(|m| * PHI)` in `[0, 1)`.
    ///
    /// Magnitudes too large to multiply fall back to their own fractional
    /// part.
    pub fn collapse(&self, token: &Token) -> Decimal {
        let magnitude = token.magnitude().abs();
        let phase = magnitude
            .checked_mul(self.constants.phi())
            .map(|v| v.fract())
            .unwrap_or_else(|| magnitude.fract());
        phase.round_dp(self.constants.precision())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::str::FromStr;

    fn channel() -> EnvironmentChannel {
        let constants = Arc::new(EngineConstants::derive(&EngineConfig::default()).unwrap());
        EnvironmentChannel::new(constants, 50)
    }

    fn token(s: &str) -> Token {
        Token::mint(Decimal::from_str(s).unwrap(), 24, TransformKind::Admitted)
    }

    #[test]
    fn test_offset_is_bounded_and_non_zero() {
        let ch = channel();
        for word in 0..1000u64 {
            let offset = ch.offset(word);
            assert!(offset != 0);
            assert!(offset.abs() <= 50);
        }
        assert_eq!(ch.offset(0), -1);
        assert_eq!(ch.offset(49), -50);
        assert_eq!(ch.offset(50), 1);
        assert_eq!(ch.offset(99), 50);
    }

    #[test]
    fn test_correction_cancels_noise() {
        let ch = channel();
        let original = token("1.618033988749894848204586");
        for word in [0u64, 17, 49, 50, 99, u64::MAX] {
            let noised = ch.perturb(&original, word);
            assert_ne!(noised.magnitude(), original.magnitude());
            assert_eq!(ch.correct(&noised).magnitude(), original.magnitude());
        }
    }

    #[test]
    fn test_noise_at_admission_bound_is_exact() {
        let ch = channel();
        let edge = Token::mint(ch.constants.admission_bound(), 24, TransformKind::Admitted);
        for word in [0u64, 49, 50, 99] {
            let noised = ch.perturb(&edge, word);
            let delta = noised.magnitude() - edge.magnitude();
            assert_eq!(delta, Decimal::new(ch.offset(word), 28));
            assert_eq!(ch.correct(&noised).magnitude(), edge.magnitude());
        }
    }

    #[test]
    fn test_noise_on_large_magnitude_is_never_lost() {
        let ch = channel();
        let magnitudes = [
            "7.618033988749894848204586",
            "11.618033988749894848204586",
            "1000.618033988749894848204586",
        ];
        for text in magnitudes {
            let grown = token(text).scale(Decimal::ONE);
            for word in 0..100u64 {
                let noised = ch.perturb(&grown, word);
                assert_ne!(noised.magnitude(), grown.magnitude(), "{} word {}", text, word);
                assert!(!noised.is_saturated());
            }
        }
    }

    #[test]
    fn test_correction_is_idempotent() {
        let ch = channel();
        let noised = ch.perturb(&token("1.25"), 7);
        let once = ch.correct(&noised);
        let twice = ch.correct(&once);
        assert_eq!(once.magnitude(), twice.magnitude());
    }

    #[test]
    fn test_correction_does_not_undo_scaling() {
        let ch = channel();
        let original = token("1.618033988749894848204586");
        let attacked = original.scale(Decimal::from(432));
        assert_ne!(ch.correct(&attacked).magnitude(), original.magnitude());
    }

    #[test]
    fn test_noise_on_saturated_token_does_not_fail() {
        let ch = channel();
        let blown = token("10000000000000000").square();
        let noised = ch.perturb(&blown, 99);
        assert!(noised.is_saturated());
        let _ = ch.correct(&noised);
        let _ = ch.collapse(&noised);
    }

    #[test]
    fn test_collapse_is_a_phase() {
        let ch = channel();
        let reading = ch.collapse(&token("1.618033988749894848204586"));
        assert!(reading >= Decimal::ZERO && reading < Decimal::ONE);
        // phi * phi = phi + 1, so the phase of phi is phi - 1
        assert!((reading - Decimal::from_str("0.618033988749894848204586").unwrap()).abs()
            < Decimal::new(1, 20));
    }
}
