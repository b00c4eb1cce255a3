//! Per-dimension basis constants.
//!
//! Every dimension `k` owns a fixed quotient stream derived from PHI's
//! digits, the resonance constant and `k`. The streams are pure functions of
//! the constant set, so two engines with the same configuration agree on
//! every basis constant and every entangled pair.

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::constants::EngineConstants;
use crate::error::{ConfigError, InputError};
use crate::integrity::certificate::canonical_magnitude;
use crate::integrity::expansion::evaluate;

const BASIS_DOMAIN: &[u8] = b"killswitch-core/basis/v1";

/// Partial quotients stored per dimension (after the integer part).
pub const BASIS_TERMS: usize = 256;

/// Expand a seed into `count` partial quotients in `1..=4`.
///
/// Each SHA-256 block of `seed || block_index` yields 128 two-bit digits.
pub(crate) fn hashed_quotients(seed: &[u8], count: usize) -> Vec<u32> {
    let mut out = Vec::with_capacity(count);
    let mut block: u64 = 0;
    while out.len() < count {
        let digest = Sha256::new()
            .chain_update(seed)
            .chain_update(block.to_be_bytes())
            .finalize();
        'bytes: for byte in digest.iter() {
            for shift in [6u8, 4, 2, 0] {
                if out.len() == count {
                    break 'bytes;
                }
                out.push(u32::from((byte >> shift) & 0b11) + 1);
            }
        }
        block += 1;
    }
    out
}

#[derive(Debug, Clone)]
pub struct BasisLedger {
    streams: Vec<Vec<u32>>,
    anchors: Vec<Decimal>,
}

impl BasisLedger {
    pub fn new(constants: &EngineConstants) -> Result<Self, ConfigError> {
        let phi_digits = constants.phi_digits();
        let resonance = canonical_magnitude(constants.resonance());

        let mut streams = Vec::with_capacity(constants.dimension_count());
        let mut anchors = Vec::with_capacity(constants.dimension_count());

        for k in 0..constants.dimension_count() {
            let mut seed = Vec::with_capacity(BASIS_DOMAIN.len() + phi_digits.len() + 48);
            seed.extend_from_slice(BASIS_DOMAIN);
            seed.extend_from_slice(&phi_digits);
            seed.extend_from_slice(resonance.as_bytes());
            seed.extend_from_slice(&(k as u64).to_be_bytes());

            let stream = hashed_quotients(&seed, BASIS_TERMS);

            let mut terms = Vec::with_capacity(BASIS_TERMS + 1);
            terms.push(1);
            terms.extend_from_slice(&stream);
            let anchor = evaluate(&terms)
                .ok_or_else(|| ConfigError::ArithmeticOverflow(format!("basis constant {}", k)))?
                .round_dp(constants.precision());

            streams.push(stream);
            anchors.push(anchor);
        }

        Ok(Self { streams, anchors })
    }

    pub fn dimension_count(&self) -> usize {
        self.streams.len()
    }

    /// Partial quotients of dimension `k`, integer part excluded.
    pub fn stream(&self, k: usize) -> Result<&[u32], InputError> {
        self.streams
            .get(k)
            .map(Vec::as_slice)
            .ok_or(InputError::DimensionOutOfRange {
                index: k,
                dimensions: self.streams.len(),
            })
    }

    /// The k-th basis constant `[1; b_k]` at engine precision.
    pub fn constant(&self, k: usize) -> Result<Decimal, InputError> {
        self.anchors
            .get(k)
            .copied()
            .ok_or(InputError::DimensionOutOfRange {
                index: k,
                dimensions: self.anchors.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn ledger() -> BasisLedger {
        let constants = EngineConstants::derive(&EngineConfig::default()).unwrap();
        BasisLedger::new(&constants).unwrap()
    }

    #[test]
    fn test_hashed_quotients_range_and_length() {
        let q = hashed_quotients(b"seed", 300);
        assert_eq!(q.len(), 300);
        assert!(q.iter().all(|a| (1..=4).contains(a)));
    }

    #[test]
    fn test_hashed_quotients_are_deterministic() {
        assert_eq!(hashed_quotients(b"x", 64), hashed_quotients(b"x", 64));
        assert_ne!(hashed_quotients(b"x", 64), hashed_quotients(b"y", 64));
    }

    #[test]
    fn test_every_dimension_has_a_constant() {
        let basis = ledger();
        assert_eq!(basis.dimension_count(), 75);
        for k in 0..75 {
            let c = basis.constant(k).unwrap();
            assert!(c > Decimal::ONE && c < Decimal::TWO);
            assert_eq!(basis.stream(k).unwrap().len(), BASIS_TERMS);
        }
    }

    #[test]
    fn test_dimensions_are_distinct() {
        let basis = ledger();
        assert_ne!(basis.stream(0).unwrap(), basis.stream(1).unwrap());
        assert_ne!(basis.constant(0).unwrap(), basis.constant(74).unwrap());
    }

    #[test]
    fn test_out_of_range() {
        let basis = ledger();
        assert_eq!(
            basis.constant(75),
            Err(InputError::DimensionOutOfRange { index: 75, dimensions: 75 })
        );
        assert!(basis.stream(usize::MAX).is_err());
    }

    #[test]
    fn test_same_config_same_basis() {
        let a = ledger();
        let b = ledger();
        assert_eq!(a.constant(42).unwrap(), b.constant(42).unwrap());
    }
}
