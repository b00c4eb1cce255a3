//! Exact continued-fraction arithmetic on decimal magnitudes.
//!
//! A decimal `M / 10^s` is an exact rational, so its continued fraction can
//! be computed with integer Euclid steps and no rounding at all. The
//! convergent denominators `k_n` drive both the irrationality certificate
//! and the agreement feature used by the correlation analyzer.

use rust_decimal::Decimal;

/// Upper bound on inspected quotients, independent of the inspection limit.
const MAX_INSPECTED_TERMS: usize = 128;

/// Partial quotients of a magnitude up to an inspection limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// `a_0, a_1, ...` whose convergent denominators stay within the limit.
    pub quotients: Vec<u128>,
    /// First quotient whose convergent would cross the limit.
    pub witness: Option<u128>,
    /// The expansion ended inside the limit: the value is an exact
    /// rational with a small denominator.
    pub terminated: bool,
}

/// Largest convergent denominator examined at `precision` digits:
/// `10^(precision / 2 - 2)`.
///
/// Convergents this small are far above the rounding floor `10^-precision`,
/// so rounding a magnitude never changes its inspected quotients.
pub fn inspection_limit(precision: u32) -> u128 {
    let exponent = (precision / 2).saturating_sub(2).min(36);
    10u128.pow(exponent)
}

/// Expand `|value|` until a convergent denominator would exceed `limit`.
pub fn expand(value: Decimal, limit: u128) -> Expansion {
    let mut num = value.mantissa().unsigned_abs();
    let mut den = 10u128.pow(value.scale());

    let mut quotients = Vec::new();
    let mut witness = None;
    let mut terminated = false;

    // k_{-2} = 1, k_{-1} = 0
    let (mut k_prev2, mut k_prev1) = (1u128, 0u128);

    loop {
        if den == 0 {
            terminated = true;
            break;
        }
        let a = num / den;
        let r = num % den;

        let k = a
            .checked_mul(k_prev1)
            .and_then(|v| v.checked_add(k_prev2))
            .filter(|k| *k <= limit);
        match k {
            Some(k) if quotients.len() < MAX_INSPECTED_TERMS => {
                quotients.push(a);
                k_prev2 = k_prev1;
                k_prev1 = k;
            }
            _ => {
                witness = Some(a);
                break;
            }
        }

        num = den;
        den = r;
    }

    Expansion {
        quotients,
        witness,
        terminated,
    }
}

/// Evaluate `[a_0; a_1, ..., a_n]` backwards at full decimal precision.
///
/// Returns `None` for an empty slice or when an intermediate value leaves
/// the decimal range.
pub fn evaluate(terms: &[u32]) -> Option<Decimal> {
    let (last, rest) = terms.split_last()?;
    let mut value = Decimal::from(*last);
    for term in rest.iter().rev() {
        let tail = Decimal::ONE.checked_div(value)?;
        value = Decimal::from(*term).checked_add(tail)?;
    }
    Some(value)
}

/// Tracks convergent denominators while a term stream is being built.
#[derive(Debug, Clone)]
pub struct DenominatorTracker {
    k_prev2: u128,
    k_prev1: u128,
    limit: u128,
}

impl DenominatorTracker {
    pub fn new(limit: u128) -> Self {
        Self {
            k_prev2: 1,
            k_prev1: 0,
            limit,
        }
    }

    /// Feed the next quotient. Returns true while the convergent
    /// denominator is still inside the limit.
    pub fn push(&mut self, term: u32) -> bool {
        let k = u128::from(term)
            .checked_mul(self.k_prev1)
            .and_then(|v| v.checked_add(self.k_prev2));
        match k {
            Some(k) => {
                self.k_prev2 = self.k_prev1;
                self.k_prev1 = k;
                k <= self.limit
            }
            None => {
                self.k_prev2 = self.k_prev1;
                self.k_prev1 = u128::MAX;
                false
            }
        }
    }
}

/// Length of the shared leading run of two quotient lists.
pub fn common_prefix(a: &[u128], b: &[u128]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
