//! Immutable state tokens.
//!
//! A [`Token`] is a value: every transformation returns a new token and the
//! receiver is never touched. Hostile algebra (scaling, squaring, products)
//! never fails. Results that leave the decimal range saturate at
//! `Decimal::MAX` and are flagged, which makes them fail boundedness checks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::integrity::certificate::IrrationalityCertificate;

/// How a token came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransformKind {
    Generated,
    Superposition,
    Entangled,
    Admitted,
    Noise,
    Correction,
    Scale,
    Square,
    Product,
}

impl TransformKind {
    /// Transformations outside the engine's own noise model.
    pub fn is_hostile(&self) -> bool {
        matches!(self, Self::Scale | Self::Square | Self::Product)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Superposition => "superposition",
            Self::Entangled => "entangled",
            Self::Admitted => "admitted",
            Self::Noise => "noise",
            Self::Correction => "correction",
            Self::Scale => "scale",
            Self::Square => "square",
            Self::Product => "product",
        }
    }
}

/// Derivation record carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Certificate digest of the minted token this one descends from.
    pub root: String,
    /// Last transformation applied.
    pub last: TransformKind,
    /// Noise and correction steps since minting.
    pub natural_steps: u32,
    /// Scale, square and product steps since minting.
    pub hostile_steps: u32,
    /// Some hostile step overflowed the decimal range.
    pub saturated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Token {
    magnitude: Decimal,
    certificate: IrrationalityCertificate,
    generated_at: DateTime<Utc>,
    provenance: Provenance,
}

impl Token {
    /// Mint a root token: its provenance starts at its own digest.
    pub(crate) fn mint(magnitude: Decimal, precision: u32, kind: TransformKind) -> Self {
        let certificate = IrrationalityCertificate::issue(magnitude, precision);
        let provenance = Provenance {
            root: certificate.digest().to_string(),
            last: kind,
            natural_steps: 0,
            hostile_steps: 0,
            saturated: false,
        };
        Self {
            magnitude,
            certificate,
            generated_at: Utc::now(),
            provenance,
        }
    }

    /// Build a descendant of `self` with a new magnitude.
    pub(crate) fn derive(&self, magnitude: Decimal, kind: TransformKind, saturated: bool) -> Self {
        let mut provenance = self.provenance.clone();
        provenance.last = kind;
        provenance.saturated |= saturated;
        if kind.is_hostile() {
            provenance.hostile_steps = provenance.hostile_steps.saturating_add(1);
        } else {
            provenance.natural_steps = provenance.natural_steps.saturating_add(1);
        }
        Self {
            magnitude,
            certificate: IrrationalityCertificate::issue(magnitude, self.certificate.precision()),
            generated_at: Utc::now(),
            provenance,
        }
    }

    pub fn magnitude(&self) -> Decimal {
        self.magnitude
    }

    pub fn certificate(&self) -> &IrrationalityCertificate {
        &self.certificate
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn digest(&self) -> &str {
        self.certificate.digest()
    }

    pub fn is_saturated(&self) -> bool {
        self.provenance.saturated
    }

    /// Multiply the magnitude by an arbitrary factor.
    pub fn scale(&self, factor: Decimal) -> Token {
        let negative = self.magnitude.is_sign_negative() != factor.is_sign_negative();
        self.hostile(self.magnitude.checked_mul(factor), negative, TransformKind::Scale)
    }

    pub fn square(&self) -> Token {
        self.hostile(self.magnitude.checked_mul(self.magnitude), false, TransformKind::Square)
    }

    /// Multiply two tokens. The result descends from `self`.
    pub fn product(&self, other: &Token) -> Token {
        let negative = self.magnitude.is_sign_negative() != other.magnitude.is_sign_negative();
        self.hostile(
            self.magnitude.checked_mul(other.magnitude),
            negative,
            TransformKind::Product,
        )
    }

    fn hostile(&self, result: Option<Decimal>, negative: bool, kind: TransformKind) -> Token {
        match result {
            Some(magnitude) => self.derive(magnitude, kind, false),
            None => {
                let bound = if negative { Decimal::MIN } else { Decimal::MAX };
                self.derive(bound, kind, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn token(s: &str) -> Token {
        Token::mint(Decimal::from_str(s).unwrap(), 24, TransformKind::Admitted)
    }

    #[test]
    fn test_transforms_leave_original_untouched() {
        let original = token("1.6180339887");
        let before = original.magnitude();
        let scaled = original.scale(Decimal::from(3));
        let squared = original.square();

        assert_eq!(original.magnitude(), before);
        assert_eq!(original.provenance().hostile_steps, 0);
        assert_eq!(scaled.magnitude(), Decimal::from_str("4.8541019661").unwrap());
        assert_eq!(squared.provenance().hostile_steps, 1);
    }

    #[test]
    fn test_descendants_share_root() {
        let original = token("1.25");
        let derived = original.scale(Decimal::TWO).square();
        assert_eq!(derived.provenance().root, original.digest());
        assert_eq!(derived.provenance().hostile_steps, 2);
        assert_eq!(derived.provenance().last, TransformKind::Square);
    }

    #[test]
    fn test_overflow_saturates() {
        let huge = token("10000000000000000");
        let blown = huge.square();
        assert!(blown.is_saturated());
        assert_eq!(blown.magnitude(), Decimal::MAX);

        // Saturation sticks through later steps.
        let again = blown.scale(Decimal::from(432));
        assert!(again.is_saturated());
    }

    #[test]
    fn test_negative_overflow_saturates_low() {
        let huge = token("10000000000000000");
        let blown = huge.product(&huge.scale(Decimal::NEGATIVE_ONE));
        assert_eq!(blown.magnitude(), Decimal::MIN);
    }

    #[test]
    fn test_hostile_classification() {
        assert!(TransformKind::Scale.is_hostile());
        assert!(TransformKind::Product.is_hostile());
        assert!(!TransformKind::Noise.is_hostile());
        assert!(!TransformKind::Correction.is_hostile());
        assert_eq!(TransformKind::Square.as_str(), "square");
    }
}
