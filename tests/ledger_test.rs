//! History ledger behaviour through the engine.

use killswitch_core::{EngineConfig, EntryKind, IntegrityEngine, LedgerError, SeededEntropy};

fn engine_with_capacity(capacity: usize) -> IntegrityEngine {
    let config = EngineConfig {
        history_capacity: capacity,
        ..Default::default()
    };
    IntegrityEngine::with_entropy(config, SeededEntropy::new(200)).unwrap()
}

#[test]
fn noise_entries_link_input_and_output() {
    let mut engine = engine_with_capacity(16);
    let state = engine.generate_irrational_state();
    let noised = engine.apply_environmental_noise(&state);

    let entry = engine.history().latest().unwrap();
    assert_eq!(entry.kind, EntryKind::Noise);
    assert_eq!(entry.source.as_deref(), Some(state.digest()));
    assert_eq!(entry.subject.as_deref(), Some(noised.digest()));
    assert_eq!(entry.snapshot, noised.magnitude().normalize().to_string());
}

#[test]
fn ring_buffer_bounds_length() {
    let mut engine = engine_with_capacity(64);
    let state = engine.generate_irrational_state();

    let mut previous = 0;
    for _ in 0..200 {
        engine.apply_environmental_noise(&state);
        let len = engine.history().len();
        assert!(len >= previous);
        assert!(len <= 64);
        previous = len;
    }

    assert_eq!(engine.history().len(), 64);
    assert_eq!(engine.history().evicted(), 136);
    assert_eq!(engine.history().total_recorded(), 200);
    assert!(engine.verify_history().is_ok());
}

#[test]
fn measurements_are_pure_by_default() {
    let mut engine = engine_with_capacity(16);
    let state = engine.generate_irrational_state();
    let first = engine.measure_state(&state);
    let second = engine.measure_state(&state);
    assert_eq!(first, second);
    assert!(engine.history().is_empty());
}

#[test]
fn honest_external_records_do_not_conflict() {
    let mut engine = engine_with_capacity(16);
    let state = engine.generate_irrational_state();
    let snapshot = state.magnitude().normalize().to_string();

    engine
        .history_mut()
        .append_external(snapshot, Some(state.digest().to_string()));
    engine.history_mut().append_external("free-form note", None);

    assert!(engine.validate_quantum_state(&state));
    assert!(engine.history().conflicting_claim(&state).is_none());
}

#[test]
fn forged_claim_is_reported_by_sequence() {
    let mut engine = engine_with_capacity(16);
    let state = engine.generate_irrational_state();
    engine.apply_environmental_noise(&state);
    engine
        .history_mut()
        .append_external("3.14", Some(state.digest().to_string()));

    let conflict = engine.history().conflicting_claim(&state).unwrap();
    assert_eq!(conflict.sequence, 1);
    assert_eq!(
        engine.inspect_state(&state),
        Err(killswitch_core::Violation::LedgerConflict { sequence: 1 })
    );
}

#[test]
fn forged_claim_evicted_from_window_no_longer_conflicts() {
    let mut engine = engine_with_capacity(4);
    let state = engine.generate_irrational_state();
    engine
        .history_mut()
        .append_external("3.14", Some(state.digest().to_string()));
    assert!(!engine.validate_quantum_state(&state));

    for _ in 0..4 {
        engine.apply_environmental_noise(&state);
    }
    assert!(engine.validate_quantum_state(&state));
}

#[test]
fn export_round_trips_through_serde() {
    let mut engine = engine_with_capacity(16);
    let state = engine.generate_irrational_state();
    engine.apply_environmental_noise(&state);
    engine.apply_environmental_noise(&state);

    let json = engine.history().export_json().unwrap();
    let parsed: Vec<killswitch_core::HistoryEntry> = serde_json::from_str(&json).unwrap();
    let retained: Vec<_> = engine.history().entries().cloned().collect();
    assert_eq!(parsed, retained);
}

#[test]
fn ledger_error_display() {
    let err = LedgerError::ChainMismatch { sequence: 3 };
    assert!(err.to_string().contains("sequence 3"));
}
