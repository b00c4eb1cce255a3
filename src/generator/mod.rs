//! Token generation from PHI, basis constants and injected entropy.

pub mod basis;
pub mod entropy;
pub mod state;

pub use basis::BasisLedger;
pub use entropy::{EntropySource, ReplayEntropy, SeededEntropy, SystemEntropy};
pub use state::StateGenerator;
