//! Token validation and coherence metrics.
//!
//! The validator never searches for rational approximations itself. It
//! re-checks that a token's certificate was issued for its magnitude and
//! reads the verdict. Everything else is a bounds check or a ledger lookup,
//! so validation cost does not grow with the amount of hostile work done on
//! copies of a token.

use std::sync::Arc;

use rust_decimal::{Decimal, MathematicalOps};
use thiserror::Error;

use crate::config::correction_radius;
use crate::constants::EngineConstants;
use crate::history::ledger::HistoryLedger;
use crate::token::Token;

/// First invariant a token fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("Certificate was not issued for this magnitude")]
    CertificateUnbound,

    #[error("Certificate precision {actual} does not match engine precision {expected}")]
    PrecisionMismatch { expected: u32, actual: u32 },

    #[error("Magnitude saturated by an overflowing transformation")]
    Saturated,

    #[error("Magnitude {0} is not positive")]
    NonPositive(Decimal),

    #[error("Magnitude {magnitude} exceeds dimension span {span}")]
    ExceedsSpan { magnitude: Decimal, span: Decimal },

    #[error("Magnitude has a close rational approximation")]
    NearRational,

    #[error("History entry #{sequence} contradicts this token")]
    LedgerConflict { sequence: u64 },
}

#[derive(Debug, Clone)]
pub struct IntegrityValidator {
    constants: Arc<EngineConstants>,
    drift_budget: Decimal,
}

impl IntegrityValidator {
    pub fn new(constants: Arc<EngineConstants>, noise_amplitude: u32) -> Self {
        let drift_budget = drift_budget(constants.guard_digits(), noise_amplitude);
        Self {
            constants,
            drift_budget,
        }
    }

    /// Expected noise rounds before a random walk leaves the correction
    /// radius.
    pub fn drift_budget(&self) -> Decimal {
        self.drift_budget
    }

    /// Certificate verdict, provided the certificate belongs to the token.
    pub fn check_irrationality(&self, token: &Token) -> bool {
        let certificate = token.certificate();
        certificate.binds(token.magnitude()) && certificate.is_irrational()
    }

    /// Run every check and report the first failure.
    pub fn inspect(&self, token: &Token, ledger: &HistoryLedger) -> Result<(), Violation> {
        let magnitude = token.magnitude();
        let certificate = token.certificate();

        if !certificate.binds(magnitude) {
            return Err(Violation::CertificateUnbound);
        }
        if certificate.precision() != self.constants.precision() {
            return Err(Violation::PrecisionMismatch {
                expected: self.constants.precision(),
                actual: certificate.precision(),
            });
        }
        if token.is_saturated() {
            return Err(Violation::Saturated);
        }
        if magnitude <= Decimal::ZERO {
            return Err(Violation::NonPositive(magnitude));
        }
        if magnitude > self.constants.dimension_span() {
            return Err(Violation::ExceedsSpan {
                magnitude,
                span: self.constants.dimension_span(),
            });
        }
        if !certificate.is_irrational() {
            return Err(Violation::NearRational);
        }
        if let Some(entry) = ledger.conflicting_claim(token) {
            return Err(Violation::LedgerConflict {
                sequence: entry.sequence,
            });
        }
        Ok(())
    }

    pub fn validate(&self, token: &Token, ledger: &HistoryLedger) -> bool {
        self.inspect(token, ledger).is_ok()
    }

    /// Noise rounds the token is expected to survive, scaled down by its
    /// weakest certified quotient and by every hostile step in its
    /// derivation. Zero for tokens that fail validation.
    pub fn coherence_time(&self, token: &Token, ledger: &HistoryLedger) -> Decimal {
        if !self.validate(token, ledger) {
            return Decimal::ZERO;
        }
        let weakest = u64::try_from(token.certificate().max_quotient().max(1))
            .map(Decimal::from)
            .unwrap_or(Decimal::MAX);
        let decay = self
            .constants
            .hostile_decay()
            .checked_powu(u64::from(token.provenance().hostile_steps))
            .unwrap_or(Decimal::ZERO);

        self.drift_budget
            .checked_div(weakest)
            .and_then(|v| v.checked_mul(decay))
            .map(|v| v.round_dp(self.constants.precision()))
            .unwrap_or(Decimal::ZERO)
    }
}

/// `3 R^2 / (A (A + 1))` with R and A in noise units.
fn drift_budget(guard_digits: u32, noise_amplitude: u32) -> Decimal {
    let radius = u64::try_from(correction_radius(guard_digits))
        .map(Decimal::from)
        .unwrap_or(Decimal::ZERO);
    let amplitude = Decimal::from(noise_amplitude.max(1));
    let numerator = Decimal::from(3) * radius * radius;
    let denominator = amplitude * (amplitude + Decimal::ONE);
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, COHERENCE_THRESHOLD};
    use crate::token::TransformKind;
    use std::str::FromStr;

    const PHI_24: &str = "1.618033988749894848204586";

    fn validator() -> IntegrityValidator {
        let constants = Arc::new(EngineConstants::derive(&EngineConfig::default()).unwrap());
        IntegrityValidator::new(constants, 50)
    }

    fn token(s: &str) -> Token {
        Token::mint(Decimal::from_str(s).unwrap(), 24, TransformKind::Admitted)
    }

    #[test]
    fn test_drift_budget_default() {
        // 3 * 5000^2 / (50 * 51)
        let budget = validator().drift_budget();
        assert!(budget > Decimal::from(29_411) && budget < Decimal::from(29_412));
    }

    #[test]
    fn test_phi_token_validates() {
        let v = validator();
        let ledger = HistoryLedger::new(16);
        let t = token(PHI_24);
        assert!(v.check_irrationality(&t));
        assert_eq!(v.inspect(&t, &ledger), Ok(()));
        assert!(v.coherence_time(&t, &ledger) > Decimal::from(COHERENCE_THRESHOLD));
    }

    #[test]
    fn test_rational_token_fails() {
        let v = validator();
        let ledger = HistoryLedger::new(16);
        let t = token("1.25");
        assert!(!v.check_irrationality(&t));
        assert_eq!(v.inspect(&t, &ledger), Err(Violation::NearRational));
        assert_eq!(v.coherence_time(&t, &ledger), Decimal::ZERO);
    }

    #[test]
    fn test_bounds() {
        let v = validator();
        let ledger = HistoryLedger::new(16);

        let negative = token("-1.618033988749894848204586");
        assert!(matches!(v.inspect(&negative, &ledger), Err(Violation::NonPositive(_))));

        let huge = token("7700000000000000.618033988749");
        assert!(matches!(v.inspect(&huge, &ledger), Err(Violation::ExceedsSpan { .. })));

        let blown = token("10000000000000000").square();
        assert_eq!(v.inspect(&blown, &ledger), Err(Violation::Saturated));
    }

    #[test]
    fn test_precision_mismatch() {
        let v = validator();
        let ledger = HistoryLedger::new(16);
        let t = Token::mint(Decimal::from_str(PHI_24).unwrap(), 23, TransformKind::Admitted);
        assert_eq!(
            v.inspect(&t, &ledger),
            Err(Violation::PrecisionMismatch { expected: 24, actual: 23 })
        );
    }

    #[test]
    fn test_ledger_conflict_invalidates() {
        let v = validator();
        let mut ledger = HistoryLedger::new(16);
        let t = token(PHI_24);
        ledger.append_external("2.0", Some(t.digest().to_string()));
        assert_eq!(
            v.inspect(&t, &ledger),
            Err(Violation::LedgerConflict { sequence: 0 })
        );
        assert_eq!(v.coherence_time(&t, &ledger), Decimal::ZERO);
    }

    #[test]
    fn test_violation_display() {
        let err = Violation::LedgerConflict { sequence: 7 };
        assert_eq!(err.to_string(), "History entry #7 contradicts this token");
    }
}
