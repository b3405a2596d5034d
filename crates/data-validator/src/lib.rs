//! Reading Validation
//!
//! Rejects incomplete or malformed submissions before they reach the
//! decision engine. Out-of-range values are not errors; the scorers clamp them.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{FatigueInput, ReadingSubmission, ValidationResult, Validator};
