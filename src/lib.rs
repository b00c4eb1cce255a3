//! killswitch-core
//!
//! An integrity engine that issues verifiable numeric state tokens and
//! keeps judging them correctly while copies of those tokens are attacked.
//!
//! # Components
//!
//! - **StateGenerator**: mints tokens from PHI, per-dimension basis
//!   constants and injected entropy.
//! - **HistoryLedger**: append-only, hash-linked audit log of noised and
//!   measured states, kept in a bounded ring buffer.
//! - **CorrelationAnalyzer**: entanglement, fidelity and Bell-style
//!   correlation checks between two tokens.
//! - **IntegrityValidator**: irrationality, boundedness and ledger
//!   consistency of a token, plus its coherence time.
//!
//! # Invariants
//!
//! - Tokens are values. No operation mutates a token it is given.
//! - Hostile algebra never fails: overflow saturates and is flagged.
//! - All arithmetic is fixed-precision decimal; no binary floating point
//!   touches a magnitude.
//! - Validating a token reads its certificate. Work done on copies cannot
//!   change the verdict for the original.

pub mod config;
pub mod constants;
pub mod correlation;
pub mod error;
pub mod generator;
pub mod history;
pub mod integrity;
pub mod telemetry;
pub mod token;

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

pub use config::EngineConfig;
pub use constants::EngineConstants;
pub use correlation::CorrelationAnalyzer;
pub use error::{ConfigError, InputError, LedgerError};
pub use generator::{EntropySource, ReplayEntropy, SeededEntropy, StateGenerator, SystemEntropy};
pub use history::{EntryKind, EnvironmentChannel, HistoryEntry, HistoryLedger};
pub use integrity::{IntegrityValidator, IrrationalityCertificate, Violation};
pub use token::{Provenance, Token, TransformKind};

use telemetry::IntegrityEvent;

/// Spellings of non-finite values rejected by [`IntegrityEngine::parse_magnitude`].
const NON_FINITE: &[&str] = &[
    "nan", "+nan", "-nan", "inf", "+inf", "-inf", "infinity", "+infinity", "-infinity",
];

/// One engine instance: constants, components, ledger and entropy.
pub struct IntegrityEngine {
    config: EngineConfig,
    constants: Arc<EngineConstants>,
    generator: StateGenerator,
    correlation: CorrelationAnalyzer,
    validator: IntegrityValidator,
    channel: EnvironmentChannel,
    history: HistoryLedger,
    entropy: Box<dyn EntropySource>,
}

impl IntegrityEngine {
    /// Create an engine drawing from system entropy.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_entropy(config, SystemEntropy::new())
    }

    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(EngineConfig::default())
    }

    /// Create an engine configured from `KILLSWITCH_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(config::load())
    }

    /// Create an engine with an injected entropy source. Identical configs
    /// and identical entropy sequences produce identical token sequences.
    pub fn with_entropy(
        config: EngineConfig,
        entropy: impl EntropySource + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let constants = Arc::new(EngineConstants::derive(&config)?);
        let mut entropy: Box<dyn EntropySource> = Box::new(entropy);

        let generator = StateGenerator::new(Arc::clone(&constants), entropy.as_mut())?;
        let correlation = CorrelationAnalyzer::new(Arc::clone(&constants));
        let validator = IntegrityValidator::new(Arc::clone(&constants), config.noise_amplitude);
        let channel = EnvironmentChannel::new(Arc::clone(&constants), config.noise_amplitude);
        let history = HistoryLedger::new(config.history_capacity);

        crate::integrity_log!(
            IntegrityEvent::EngineStarted,
            "integrity engine ready",
            "precision" => config.precision.to_string().as_str(),
            "dimensions" => config.dimension_count.to_string().as_str(),
            "history_capacity" => config.history_capacity.to_string().as_str()
        );

        Ok(Self {
            config,
            constants,
            generator,
            correlation,
            validator,
            channel,
            history,
            entropy,
        })
    }

    // --- StateGenerator ---

    pub fn generate_irrational_state(&mut self) -> Token {
        self.generator.generate_irrational_state(self.entropy.as_mut())
    }

    pub fn generate_superposition(&mut self) -> Token {
        self.generator.generate_superposition(self.entropy.as_mut())
    }

    pub fn entangle_dimensions(&self, i: usize, j: usize) -> Result<(Token, Token), InputError> {
        self.generator.entangle_dimensions(i, j)
    }

    pub fn basis_constant(&self, k: usize) -> Result<Decimal, InputError> {
        self.generator.basis_constant(k)
    }

    // --- CorrelationAnalyzer ---

    pub fn measure_entanglement(&self, a: &Token, b: &Token) -> Decimal {
        self.correlation.measure_entanglement(a, b)
    }

    pub fn calculate_state_fidelity(&self, a: &Token, b: &Token) -> Decimal {
        self.correlation.calculate_state_fidelity(a, b)
    }

    pub fn check_bell_inequality(&self, a: &Token, b: &Token) -> bool {
        self.correlation.check_bell_inequality(a, b)
    }

    // --- IntegrityValidator ---

    pub fn check_irrationality(&self, token: &Token) -> bool {
        self.validator.check_irrationality(token)
    }

    pub fn measure_coherence_time(&self, token: &Token) -> Decimal {
        self.validator.coherence_time(token, &self.history)
    }

    /// Same checks as [`validate_quantum_state`](Self::validate_quantum_state),
    /// reporting the first violated invariant.
    pub fn inspect_state(&self, token: &Token) -> Result<(), Violation> {
        self.validator.inspect(token, &self.history)
    }

    pub fn validate_quantum_state(&self, token: &Token) -> bool {
        let result = self.inspect_state(token);
        telemetry::record_validation(result.is_ok());

        match &result {
            Ok(()) => {
                crate::integrity_log!(
                    IntegrityEvent::ValidationPassed,
                    "token valid",
                    "digest" => token.digest()
                );
            }
            Err(Violation::LedgerConflict { sequence }) => {
                crate::integrity_log!(
                    IntegrityEvent::ForgedClaim,
                    "history contradicts token",
                    "digest" => token.digest(),
                    "sequence" => sequence.to_string().as_str()
                );
            }
            Err(Violation::Saturated) => {
                crate::integrity_log!(
                    IntegrityEvent::Saturation,
                    "saturated token",
                    "digest" => token.digest()
                );
            }
            Err(violation) => {
                crate::integrity_log!(
                    IntegrityEvent::ValidationFailed,
                    &violation.to_string(),
                    "digest" => token.digest()
                );
            }
        }
        result.is_ok()
    }

    // --- Environment and history ---

    /// Perturb a copy of `token` below its precision and record the result.
    pub fn apply_environmental_noise(&mut self, token: &Token) -> Token {
        let word = self.entropy.next_word();
        let noised = self.channel.perturb(token, word);
        self.history.record_noise(token, &noised);
        telemetry::record_noise_applied();
        noised
    }

    pub fn apply_error_correction(&self, token: &Token) -> Token {
        telemetry::record_correction();
        self.channel.correct(token)
    }

    /// Collapse reading of `token`. Recorded in the ledger only when
    /// `audit_measurements` is enabled.
    pub fn measure_state(&mut self, token: &Token) -> Decimal {
        let reading = self.channel.collapse(token);
        telemetry::record_measurement();
        if self.config.audit_measurements {
            self.history.record_measurement(token, &reading.to_string());
        }
        reading
    }

    /// Recompute the ledger hash chain.
    pub fn verify_history(&self) -> Result<(), LedgerError> {
        let result = self.history.verify_chain();
        if let Err(e) = &result {
            crate::integrity_log!(IntegrityEvent::ChainBroken, &e.to_string());
        }
        result
    }

    // --- External magnitudes ---

    /// Mint a token for a caller-supplied magnitude.
    ///
    /// The magnitude must be positive, at most
    /// [`EngineConstants::admission_bound`], and carry no more fractional
    /// digits than the engine precision. The resulting token may still fail
    /// validation if the magnitude is near-rational.
    pub fn admit_magnitude(&self, magnitude: Decimal) -> Result<Token, InputError> {
        let precision = self.constants.precision();
        let result = if magnitude.scale() > precision {
            Err(InputError::PrecisionMismatch {
                expected: precision,
                actual: magnitude.scale(),
            })
        } else if magnitude <= Decimal::ZERO || magnitude > self.constants.admission_bound() {
            Err(InputError::MagnitudeOutOfBounds {
                magnitude,
                max: self.constants.admission_bound(),
            })
        } else {
            Ok(Token::mint(magnitude, precision, TransformKind::Admitted))
        };

        if let Err(e) = &result {
            crate::integrity_log!(
                IntegrityEvent::InputRejected,
                &e.to_string(),
                "security_concern" => if e.is_security_concern() { "true" } else { "false" }
            );
        }
        result
    }

    /// Parse decimal text (plain or scientific) and admit it.
    pub fn parse_magnitude(&self, text: &str) -> Result<Token, InputError> {
        let trimmed = text.trim();
        if NON_FINITE.contains(&trimmed.to_ascii_lowercase().as_str()) {
            crate::integrity_log!(
                IntegrityEvent::InputRejected,
                "non-finite magnitude",
                "input" => trimmed
            );
            return Err(InputError::NonFiniteMagnitude(trimmed.to_string()));
        }
        let magnitude = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| {
                crate::integrity_log!(IntegrityEvent::InputRejected, "malformed magnitude");
                InputError::MalformedMagnitude(trimmed.to_string())
            })?;
        self.admit_magnitude(magnitude)
    }

    // --- Accessors ---

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn constants(&self) -> &Arc<EngineConstants> {
        &self.constants
    }

    pub fn phi(&self) -> Decimal {
        self.constants.phi()
    }

    pub fn resonance(&self) -> Decimal {
        self.constants.resonance()
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.history
    }

    /// Mutable ledger access for appending external records. Existing
    /// entries cannot be modified through it.
    pub fn history_mut(&mut self) -> &mut HistoryLedger {
        &mut self.history
    }
}
