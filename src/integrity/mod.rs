//! Structural integrity of tokens: continued-fraction inspection,
//! certificates and the validator that reads them.

pub mod certificate;
pub mod expansion;
pub mod validator;

pub use certificate::IrrationalityCertificate;
pub use validator::{IntegrityValidator, Violation};
