//! Metric names and recording helpers.
//!
//! Calls are no-ops until the host installs a `metrics` recorder.

use metrics::{counter, describe_counter, describe_gauge, gauge};

use crate::token::TransformKind;

pub const TOKENS_ISSUED: &str = "killswitch_tokens_issued_total";
pub const NOISE_APPLIED: &str = "killswitch_noise_applied_total";
pub const CORRECTIONS: &str = "killswitch_corrections_total";
pub const MEASUREMENTS: &str = "killswitch_measurements_total";
pub const VALIDATIONS: &str = "killswitch_validations_total";
pub const HISTORY_LEN: &str = "killswitch_history_len";
pub const HISTORY_EVICTED: &str = "killswitch_history_evicted_total";

/// Register descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(TOKENS_ISSUED, "Tokens minted by the generator, by kind");
    describe_counter!(NOISE_APPLIED, "Environmental noise rounds applied");
    describe_counter!(CORRECTIONS, "Error corrections applied");
    describe_counter!(MEASUREMENTS, "Collapse readings taken");
    describe_counter!(VALIDATIONS, "Token validations, by outcome");
    describe_gauge!(HISTORY_LEN, "Entries retained in the history ledger");
    describe_counter!(HISTORY_EVICTED, "History entries evicted by the ring buffer");
}

pub fn record_token_issued(kind: TransformKind) {
    counter!(TOKENS_ISSUED, "kind" => kind.as_str()).increment(1);
}

pub fn record_noise_applied() {
    counter!(NOISE_APPLIED).increment(1);
}

pub fn record_correction() {
    counter!(CORRECTIONS).increment(1);
}

pub fn record_measurement() {
    counter!(MEASUREMENTS).increment(1);
}

pub fn record_validation(valid: bool) {
    let outcome = if valid { "valid" } else { "invalid" };
    counter!(VALIDATIONS, "outcome" => outcome).increment(1);
}

pub fn record_history_len(len: usize) {
    gauge!(HISTORY_LEN).set(len as f64);
}

pub fn record_history_evicted() {
    counter!(HISTORY_EVICTED).increment(1);
}
