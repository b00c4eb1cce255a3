//! State token generation.
//!
//! Every magnitude is a continued fraction `[1; a_1, a_2, ...]` with partial
//! quotients in `1..=4` (PHI is the all-ones case). Bounded quotients keep
//! every magnitude badly approximable by rationals, so certificates for
//! generated tokens always come back irrational.
//!
//! Quotients `a_1..a_16` spell out a keyed bijection of the generation
//! counter, two bits per quotient. Two tokens from the same generator
//! differ within their first sixteen quotients, which at precision 22 or
//! more keeps their rounded magnitudes apart.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::basis::{hashed_quotients, BasisLedger};
use super::entropy::EntropySource;
use crate::constants::EngineConstants;
use crate::error::{ConfigError, InputError};
use crate::integrity::expansion::{evaluate, inspection_limit, DenominatorTracker};
use crate::telemetry;
use crate::token::{Token, TransformKind};

const STATE_DOMAIN: &[u8] = b"killswitch-core/state/v1";

/// Quotients per generated magnitude, integer part included.
pub const TERMS_PER_TOKEN: usize = 96;
/// Leading quotients carrying the counter bijection.
pub const UNIQUE_PREFIX: usize = 16;
/// Sub-streams combined by a superposition.
pub const SUPERPOSITION_WIDTH: usize = 3;
/// Quotient placed at position 1 of self-entangled pairs. Never produced by
/// ordinary generation.
pub const SELF_REFERENCE_MARKER: u32 = 9;
/// Divergent quotients appended after the shared prefix of an entangled pair.
const ENTANGLED_TAIL: usize = 64;

/// Invertible 32-bit mixer (xorshift-multiply rounds).
fn permute(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

pub struct StateGenerator {
    constants: Arc<EngineConstants>,
    basis: BasisLedger,
    phi_digits: Vec<u8>,
    key: u64,
    counter: u32,
    limit: u128,
}

impl StateGenerator {
    /// Build the basis ledger and draw the engine key from `entropy`.
    pub fn new(
        constants: Arc<EngineConstants>,
        entropy: &mut dyn EntropySource,
    ) -> Result<Self, ConfigError> {
        let basis = BasisLedger::new(&constants)?;
        let phi_digits = constants.phi_digits();
        let limit = inspection_limit(constants.precision());
        Ok(Self {
            constants,
            basis,
            phi_digits,
            key: entropy.next_word(),
            counter: 0,
            limit,
        })
    }

    /// Streams drawn so far. Wraps after `2^32`.
    pub fn generated(&self) -> u32 {
        self.counter
    }

    pub fn basis(&self) -> &BasisLedger {
        &self.basis
    }

    pub fn basis_constant(&self, k: usize) -> Result<Decimal, InputError> {
        self.basis.constant(k)
    }

    pub fn generate_irrational_state(&mut self, entropy: &mut dyn EntropySource) -> Token {
        let terms = self.next_stream(entropy);
        self.realize(&terms, TransformKind::Generated)
    }

    /// Combine independent streams position by position.
    ///
    /// With odd weights `w_j`, `c_n = 1 + (sum w_j (a_n^j - 1) mod 4)` is a
    /// bijection in each input quotient, so the result stays uniform over
    /// `1..=4`.
    pub fn generate_superposition(&mut self, entropy: &mut dyn EntropySource) -> Token {
        let weights: Vec<u32> = self
            .phi_digits
            .iter()
            .take(SUPERPOSITION_WIDTH)
            .map(|d| 2 * u32::from(*d) + 1)
            .collect();
        let streams: Vec<Vec<u32>> = (0..SUPERPOSITION_WIDTH)
            .map(|_| self.next_stream(entropy))
            .collect();

        let mut terms = Vec::with_capacity(TERMS_PER_TOKEN);
        terms.push(1);
        for n in 1..TERMS_PER_TOKEN {
            let sum: u32 = streams
                .iter()
                .zip(&weights)
                .map(|(stream, w)| w * (stream[n] - 1))
                .sum();
            terms.push(1 + sum % 4);
        }
        self.realize(&terms, TransformKind::Superposition)
    }

    /// Correlated pair for dimensions `i` and `j`.
    ///
    /// Both members share every quotient up to and including the first one
    /// whose convergent denominator crosses the inspection limit, then member
    /// A continues with basis `i` and member B with basis `j`. For `i == j`
    /// the shared prefix opens with [`SELF_REFERENCE_MARKER`] and member B
    /// carries the mirrored tail of basis `i`.
    pub fn entangle_dimensions(&self, i: usize, j: usize) -> Result<(Token, Token), InputError> {
        let basis_i = self.basis.stream(i)?;
        let basis_j = self.basis.stream(j)?;
        let self_referential = i == j;

        let mut tracker = DenominatorTracker::new(self.limit);
        let mut shared = vec![1u32];
        tracker.push(1);
        if self_referential {
            shared.push(SELF_REFERENCE_MARKER);
            tracker.push(SELF_REFERENCE_MARKER);
        }

        let mut n = 0;
        while n < basis_i.len() {
            let term = if self_referential {
                basis_i[n]
            } else {
                1 + (basis_i[n] - 1 + basis_j[n] - 1) % 4
            };
            shared.push(term);
            n += 1;
            if !tracker.push(term) {
                break;
            }
        }

        let end = (n + ENTANGLED_TAIL).min(basis_i.len());
        let mut member_a = shared.clone();
        member_a.extend_from_slice(&basis_i[n..end]);
        let mut member_b = shared;
        if self_referential {
            member_b.extend(basis_i[n..end].iter().map(|t| 5 - t));
        } else {
            member_b.extend_from_slice(&basis_j[n..end]);
        }

        tracing::debug!(i, j, shared = n, "entangled dimensions");
        Ok((
            self.realize(&member_a, TransformKind::Entangled),
            self.realize(&member_b, TransformKind::Entangled),
        ))
    }

    /// `[1; bijection digits, hashed tail]` for the next counter value.
    fn next_stream(&mut self, entropy: &mut dyn EntropySource) -> Vec<u32> {
        let counter = self.counter;
        self.counter = self.counter.wrapping_add(1);
        let word = entropy.next_word();

        let folded_key = (self.key ^ (self.key >> 32)) as u32;
        let code = permute(counter ^ folded_key);

        let mut terms = Vec::with_capacity(TERMS_PER_TOKEN);
        terms.push(1);
        for position in (0..UNIQUE_PREFIX).rev() {
            terms.push(((code >> (2 * position)) & 0b11) + 1);
        }

        let mut seed = Vec::with_capacity(STATE_DOMAIN.len() + self.phi_digits.len() + 20);
        seed.extend_from_slice(STATE_DOMAIN);
        seed.extend_from_slice(&self.phi_digits);
        seed.extend_from_slice(&self.key.to_be_bytes());
        seed.extend_from_slice(&counter.to_be_bytes());
        seed.extend_from_slice(&word.to_be_bytes());
        terms.extend(hashed_quotients(&seed, TERMS_PER_TOKEN - terms.len()));
        terms
    }

    fn realize(&self, terms: &[u32], kind: TransformKind) -> Token {
        let precision = self.constants.precision();
        // Quotients are all positive, so evaluation stays inside [1, 10].
        let magnitude = evaluate(terms)
            .unwrap_or_else(|| {
                tracing::error!(kind = kind.as_str(), "quotient stream failed to evaluate");
                self.constants.phi()
            })
            .round_dp(precision);
        telemetry::record_token_issued(kind);
        Token::mint(magnitude, precision, kind)
    }
}
