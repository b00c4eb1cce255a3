//! Irrationality certificates.
//!
//! A certificate is issued exactly once, when a token is created. It binds
//! the magnitude (through a SHA-256 digest) to the result of inspecting its
//! continued fraction up to the inspection limit. Validators read the
//! verdict and re-check the binding; they never search for rational
//! approximations again.

use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::expansion::{expand, inspection_limit};
use crate::config::MAX_PARTIAL_QUOTIENT;

const DIGEST_DOMAIN: &[u8] = b"killswitch-core/certificate/v1";

/// Proof that a magnitude has no close rational approximation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrrationalityCertificate {
    digest: String,
    precision: u32,
    quotients: Vec<u128>,
    max_quotient: u128,
    irrational: bool,
}

impl IrrationalityCertificate {
    /// Inspect `magnitude` and record the verdict.
    pub fn issue(magnitude: Decimal, precision: u32) -> Self {
        let expansion = expand(magnitude, inspection_limit(precision));

        let max_quotient = expansion
            .quotients
            .iter()
            .skip(1)
            .chain(expansion.witness.iter())
            .copied()
            .max()
            .unwrap_or(0);

        // The integer part is free; every later quotient bounds how well a
        // convergent approximates: |x - p/q| > 1 / ((a + 2) q^2).
        let irrational = !expansion.terminated
            && expansion.witness.is_some()
            && max_quotient <= MAX_PARTIAL_QUOTIENT;

        Self {
            digest: magnitude_digest(magnitude, precision),
            precision,
            quotients: expansion.quotients,
            max_quotient,
            irrational,
        }
    }

    /// Hex SHA-256 binding the certificate to one magnitude.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Inspected partial quotients, integer part first.
    pub fn quotients(&self) -> &[u128] {
        &self.quotients
    }

    /// Largest partial quotient seen after the integer part.
    pub fn max_quotient(&self) -> u128 {
        self.max_quotient
    }

    pub fn is_irrational(&self) -> bool {
        self.irrational
    }

    /// True if this certificate was issued for `magnitude`.
    pub fn binds(&self, magnitude: Decimal) -> bool {
        self.digest == magnitude_digest(magnitude, self.precision)
    }
}

/// Canonical text form of a magnitude (trailing zeros stripped).
pub fn canonical_magnitude(magnitude: Decimal) -> String {
    magnitude.normalize().to_string()
}

fn magnitude_digest(magnitude: Decimal, precision: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(DIGEST_DOMAIN);
    hasher.update(precision.to_be_bytes());
    hasher.update(canonical_magnitude(magnitude).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_phi_is_certified() {
        let cert = IrrationalityCertificate::issue(dec("1.618033988749894848204586834"), 24);
        assert!(cert.is_irrational());
        assert_eq!(cert.max_quotient(), 1);
    }

    #[test]
    fn test_short_decimal_is_rational() {
        let cert = IrrationalityCertificate::issue(dec("1.25"), 24);
        assert!(!cert.is_irrational());
    }

    #[test]
    fn test_integer_is_rational() {
        let cert = IrrationalityCertificate::issue(Decimal::from(432), 24);
        assert!(!cert.is_irrational());
    }

    #[test]
    fn test_near_rational_is_rejected() {
        // 1/3 + 1e-15 has a huge partial quotient right after [0; 3]
        let cert = IrrationalityCertificate::issue(dec("0.333333333333334"), 24);
        assert!(!cert.is_irrational());
        assert!(cert.max_quotient() > MAX_PARTIAL_QUOTIENT);
    }

    #[test]
    fn test_digest_binds_magnitude() {
        let cert = IrrationalityCertificate::issue(dec("1.5"), 24);
        assert!(cert.binds(dec("1.50")));
        assert!(!cert.binds(dec("1.51")));
        assert_eq!(cert.digest().len(), 64);
    }

    #[test]
    fn test_digest_depends_on_precision() {
        let a = IrrationalityCertificate::issue(dec("1.5"), 24);
        let b = IrrationalityCertificate::issue(dec("1.5"), 23);
        assert_ne!(a.digest(), b.digest());
    }
}
