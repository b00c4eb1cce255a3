//! Correlation metrics between tokens.
//!
//! Two features feed every metric:
//!
//! - **proximity** `1 - |a - b| / (|a| + |b|)`: how close the magnitudes are
//!   relative to their size.
//! - **agreement**: shared leading run of both certificates' partial
//!   quotients, divided by the longer run. Magnitudes that agree on their
//!   inspected quotients share every rational approximation the validator
//!   cares about.
//!
//! Fidelity additionally weighs lineage: tokens with different roots have
//! none, and each hostile step separating two derivations of the same root
//! multiplies fidelity by `PHI^-5`. The Bell check never passes for two
//! derivations of one root separated by a hostile step, whatever their
//! magnitudes.

use std::sync::Arc;

use rust_decimal::{Decimal, MathematicalOps};

use crate::constants::EngineConstants;
use crate::integrity::expansion::common_prefix;
use crate::token::Token;

#[derive(Debug, Clone)]
pub struct CorrelationAnalyzer {
    constants: Arc<EngineConstants>,
}

impl CorrelationAnalyzer {
    pub fn new(constants: Arc<EngineConstants>) -> Self {
        Self { constants }
    }

    /// Relative closeness of the magnitudes, in `[0, 1]`. Zero when the
    /// distance itself overflows.
    pub fn proximity(&self, a: &Token, b: &Token) -> Decimal {
        let (x, y) = (a.magnitude(), b.magnitude());
        if x == y {
            return Decimal::ONE;
        }
        let ratio = x
            .checked_sub(y)
            .map(|d| d.abs())
            .zip(x.abs().checked_add(y.abs()))
            .and_then(|(distance, total)| distance.checked_div(total));
        match ratio {
            Some(r) => (Decimal::ONE - r).max(Decimal::ZERO),
            None => Decimal::ZERO,
        }
    }

    /// Shared fraction of the certified quotient runs, in `[0, 1]`.
    pub fn agreement(&self, a: &Token, b: &Token) -> Decimal {
        let qa = a.certificate().quotients();
        let qb = b.certificate().quotients();
        let longest = qa.len().max(qb.len());
        if longest == 0 {
            return Decimal::ONE;
        }
        let shared = common_prefix(qa, qb);
        Decimal::from(shared as u64) / Decimal::from(longest as u64)
    }

    /// Symmetric similarity in `[0, 1]`, exactly 1 for equal magnitudes.
    pub fn measure_entanglement(&self, a: &Token, b: &Token) -> Decimal {
        if a.magnitude() == b.magnitude() {
            return Decimal::ONE;
        }
        let value = self.proximity(a, b) * self.agreement(a, b);
        value.round_dp(self.constants.precision())
    }

    /// How closely `b` reproduces `a` through natural operations only.
    pub fn calculate_state_fidelity(&self, a: &Token, b: &Token) -> Decimal {
        let lineage = self.lineage(a, b);
        if lineage.is_zero() {
            return Decimal::ZERO;
        }
        let proximity = self.proximity(a, b);
        let value = proximity * proximity * self.agreement(a, b) * lineage;
        value.round_dp(self.constants.precision())
    }

    /// True only when the correlation beats the classical bound `1/sqrt(2)`
    /// and neither token is a hostile derivation of the other.
    pub fn check_bell_inequality(&self, a: &Token, b: &Token) -> bool {
        let (pa, pb) = (a.provenance(), b.provenance());
        if pa.root == pb.root && pa.hostile_steps != pb.hostile_steps {
            tracing::trace!(
                hostile_a = pa.hostile_steps,
                hostile_b = pb.hostile_steps,
                "bell check: hostile derivation"
            );
            return false;
        }
        let correlation = self.measure_entanglement(a, b);
        let violated = correlation > self.constants.classical_bound();
        tracing::trace!(%correlation, violated, "bell check");
        violated
    }

    fn lineage(&self, a: &Token, b: &Token) -> Decimal {
        let (pa, pb) = (a.provenance(), b.provenance());
        if pa.root != pb.root {
            return Decimal::ZERO;
        }
        let separation = pa.hostile_steps.abs_diff(pb.hostile_steps);
        self.constants
            .hostile_decay()
            .checked_powu(u64::from(separation))
            .unwrap_or(Decimal::ZERO)
    }
}
