//! Integrity event log.
//!
//! Structured records of events an auditor would want to replay: rejected
//! inputs, failed validations, forged ledger claims and saturated tokens.

/// Integrity event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityEvent {
    /// Engine constructed with a validated configuration.
    EngineStarted,
    /// A token passed validation.
    ValidationPassed,
    /// A token failed validation.
    ValidationFailed,
    /// A caller-supplied magnitude was rejected.
    InputRejected,
    /// A ledger entry claims a token state the token does not have.
    ForgedClaim,
    /// Hash chain verification failed.
    ChainBroken,
    /// A token saturated during hostile algebra.
    Saturation,
}

impl IntegrityEvent {
    pub fn severity(&self) -> IntegritySeverity {
        match self {
            Self::EngineStarted => IntegritySeverity::Info,
            Self::ValidationPassed => IntegritySeverity::Debug,
            Self::ValidationFailed => IntegritySeverity::Warning,
            Self::InputRejected => IntegritySeverity::Warning,
            Self::ForgedClaim => IntegritySeverity::Critical,
            Self::ChainBroken => IntegritySeverity::Critical,
            Self::Saturation => IntegritySeverity::Warning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EngineStarted => "engine_started",
            Self::ValidationPassed => "validation_passed",
            Self::ValidationFailed => "validation_failed",
            Self::InputRejected => "input_rejected",
            Self::ForgedClaim => "forged_claim",
            Self::ChainBroken => "chain_broken",
            Self::Saturation => "saturation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntegritySeverity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl IntegritySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Tracing target of every integrity event.
pub const INTEGRITY_TARGET: &str = "killswitch_core::integrity";

/// Render the log line for an event.
pub fn format_integrity_event(
    event: IntegrityEvent,
    message: &str,
    details: &[(&str, &str)],
) -> String {
    let details_str = details
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ");

    let head = format!(
        "[{}] INTEGRITY {} {}: {}",
        chrono::Utc::now().timestamp(),
        event.severity().as_str(),
        event.as_str(),
        message
    );
    if details_str.is_empty() {
        head
    } else {
        format!("{} | {}", head, details_str)
    }
}

/// Log an integrity event at the level matching its severity.
///
/// ```
/// use killswitch_core::telemetry::{log_integrity_event, IntegrityEvent};
///
/// log_integrity_event(
///     IntegrityEvent::InputRejected,
///     "magnitude outside dimension span",
///     &[("magnitude", "1e20")],
/// );
/// ```
pub fn log_integrity_event(event: IntegrityEvent, message: &str, details: &[(&str, &str)]) {
    let line = format_integrity_event(event, message, details);
    let name = event.as_str();
    match event.severity() {
        IntegritySeverity::Debug => {
            tracing::debug!(target: INTEGRITY_TARGET, event = name, "{}", line)
        }
        IntegritySeverity::Info => {
            tracing::info!(target: INTEGRITY_TARGET, event = name, "{}", line)
        }
        IntegritySeverity::Warning => {
            tracing::warn!(target: INTEGRITY_TARGET, event = name, "{}", line)
        }
        IntegritySeverity::Error | IntegritySeverity::Critical => {
            tracing::error!(target: INTEGRITY_TARGET, event = name, "{}", line)
        }
    }
}

/// Convenience macro for logging integrity events.
#[macro_export]
macro_rules! integrity_log {
    ($event:expr, $message:expr) => {
        $crate::telemetry::integrity_log::log_integrity_event($event, $message, &[])
    };
    ($event:expr, $message:expr, $($key:expr => $value:expr),+) => {
        $crate::telemetry::integrity_log::log_integrity_event(
            $event,
            $message,
            &[$(($key, $value)),+]
        )
    };
}
