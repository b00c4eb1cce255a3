//! Fuzz target for external magnitude parsing.
//!
//! Arbitrary text must parse into a token or an `InputError`, never panic.
//! Admitted tokens must be judged without panicking either, and noise must
//! always move them.

#![no_main]

use std::sync::OnceLock;

use killswitch_core::{EngineConfig, IntegrityEngine, SeededEntropy};
use libfuzzer_sys::fuzz_target;

fn engine() -> &'static std::sync::Mutex<IntegrityEngine> {
    static ENGINE: OnceLock<std::sync::Mutex<IntegrityEngine>> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let engine = IntegrityEngine::with_entropy(EngineConfig::default(), SeededEntropy::new(1))
            .expect("default config is valid");
        std::sync::Mutex::new(engine)
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(mut engine) = engine().lock() else {
        return;
    };
    if let Ok(token) = engine.parse_magnitude(text) {
        let _ = engine.validate_quantum_state(&token);
        let _ = engine.measure_coherence_time(&token);
        let noised = engine.apply_environmental_noise(&token);
        assert_ne!(noised.magnitude(), token.magnitude());
    }
});
