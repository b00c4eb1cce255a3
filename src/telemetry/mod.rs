//! Telemetry for the integrity engine.
//!
//! Structured logging through `tracing`, an integrity event log for
//! forensic review, and counters/gauges through the `metrics` facade. No
//! exporter is installed here; embedding applications choose their own
//! recorder and subscriber.

pub mod integrity_log;
mod logging;
mod metrics;

pub use integrity_log::{log_integrity_event, IntegrityEvent, IntegritySeverity, INTEGRITY_TARGET};
pub use logging::{build_filter, init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    describe_metrics, record_correction, record_history_evicted, record_history_len,
    record_measurement, record_noise_applied, record_token_issued, record_validation,
};
