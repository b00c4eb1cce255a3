//! Fuzz target for hostile token algebra.
//!
//! Any chain of scale/square/product/noise/correct steps on a generated
//! token must complete, and the original must keep validating.

#![no_main]

use arbitrary::Arbitrary;
use killswitch_core::{EngineConfig, IntegrityEngine, SeededEntropy};
use libfuzzer_sys::fuzz_target;
use rust_decimal::Decimal;

#[derive(Debug, Arbitrary)]
enum Step {
    Scale { mantissa: i64, scale: u8 },
    Square,
    ProductWithOriginal,
    Noise,
    Correct,
    Measure,
}

#[derive(Debug, Arbitrary)]
struct Input {
    seed: u64,
    steps: Vec<Step>,
}

fuzz_target!(|input: Input| {
    let Ok(mut engine) =
        IntegrityEngine::with_entropy(EngineConfig::default(), SeededEntropy::new(input.seed))
    else {
        return;
    };
    let state = engine.generate_irrational_state();
    let mut derived = state.clone();

    for step in input.steps.iter().take(256) {
        derived = match step {
            Step::Scale { mantissa, scale } => {
                derived.scale(Decimal::new(*mantissa, u32::from(*scale % 29)))
            }
            Step::Square => derived.square(),
            Step::ProductWithOriginal => derived.product(&state),
            Step::Noise => engine.apply_environmental_noise(&derived),
            Step::Correct => engine.apply_error_correction(&derived),
            Step::Measure => {
                let _ = engine.measure_state(&derived);
                derived
            }
        };
    }

    assert!(engine.validate_quantum_state(&state));
});
