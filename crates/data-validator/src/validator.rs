//! Submission Validator

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use risk_engine::{Fatigue, Reading};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fatigue as submitted: an ordinal or a word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FatigueInput {
    Ordinal(f64),
    Text(String),
}

/// Raw reading payload from a worker device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingSubmission {
    pub heart_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub temperature: Option<f64>,
    pub gas: Option<f64>,
    pub fatigue: Option<FatigueInput>,
}

/// Result of checking a submission
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether all values are valid
    pub valid: bool,
    /// List of validation errors
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid(fields_checked: usize) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            fields_checked,
        }
    }

    /// Create an invalid result with errors
    pub fn invalid(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        Self {
            valid: false,
            errors,
            fields_checked,
        }
    }
}

const REQUIRED_FIELDS: usize = 5;

/// Validator turning submissions into engine-ready readings
#[derive(Debug, Clone, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Check every field and collect all problems
    pub fn check(&self, submission: &ReadingSubmission) -> ValidationResult {
        let errors: Vec<ValidationError> = [
            numeric("heart_rate", submission.heart_rate).err(),
            numeric("spo2", submission.spo2).err(),
            numeric("temperature", submission.temperature).err(),
            numeric("gas", submission.gas).err(),
            fatigue(submission.fatigue.as_ref()).err(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if errors.is_empty() {
            ValidationResult::valid(REQUIRED_FIELDS)
        } else {
            ValidationResult::invalid(errors, REQUIRED_FIELDS)
        }
    }

    /// Build a reading, failing on the first missing or malformed field
    pub fn validate(
        &self,
        submission: &ReadingSubmission,
        worker_id: &str,
        zone: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Reading, ValidationError> {
        if worker_id.trim().is_empty() {
            return Err(ValidationError::InvalidFormat(
                "worker id must not be empty".to_string(),
            ));
        }

        let reading = Reading {
            worker_id: worker_id.to_string(),
            timestamp,
            heart_rate: truncate(numeric("heart_rate", submission.heart_rate)?),
            spo2: truncate(numeric("spo2", submission.spo2)?),
            temperature: numeric("temperature", submission.temperature)?,
            gas: truncate(numeric("gas", submission.gas)?),
            fatigue: fatigue(submission.fatigue.as_ref())?,
            zone: zone.to_string(),
        };

        debug!(worker_id, zone, "Submission validated");
        Ok(reading)
    }
}

fn numeric(field: &'static str, value: Option<f64>) -> Result<f64, ValidationError> {
    match value {
        None => Err(ValidationError::MissingField(field)),
        Some(v) if !v.is_finite() => Err(ValidationError::NotFinite { field, value: v }),
        Some(v) => Ok(v),
    }
}

fn fatigue(value: Option<&FatigueInput>) -> Result<Fatigue, ValidationError> {
    match value {
        None => Err(ValidationError::MissingField("fatigue")),
        Some(FatigueInput::Ordinal(v)) if !v.is_finite() => Err(ValidationError::NotFinite {
            field: "fatigue",
            value: *v,
        }),
        Some(FatigueInput::Ordinal(v)) => Ok(Fatigue::from_ordinal(truncate(*v))),
        Some(FatigueInput::Text(text)) => Ok(Fatigue::parse(text)),
    }
}

/// Integer quantities drop their fraction; `as` saturates at the i64 bounds
fn truncate(value: f64) -> i64 {
    value.trunc() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn complete() -> ReadingSubmission {
        ReadingSubmission {
            heart_rate: Some(82.0),
            spo2: Some(97.0),
            temperature: Some(36.9),
            gas: Some(20.0),
            fatigue: Some(FatigueInput::Ordinal(0.0)),
        }
    }

    #[test]
    fn test_complete_submission() {
        let validator = Validator::new();
        let reading = validator
            .validate(&complete(), "W-001", "NORMAL", Utc::now())
            .unwrap();
        assert_eq!(reading.heart_rate, 82);
        assert_eq!(reading.fatigue, Fatigue::Low);
        assert_eq!(reading.zone, "NORMAL");
        assert!(validator.check(&complete()).valid);
    }

    #[test]
    fn test_missing_field() {
        let validator = Validator::new();
        let submission = ReadingSubmission {
            spo2: None,
            ..complete()
        };
        assert_eq!(
            validator
                .validate(&submission, "W-001", "NORMAL", Utc::now())
                .unwrap_err(),
            ValidationError::MissingField("spo2")
        );
    }

    #[test]
    fn test_check_reports_every_missing_field() {
        let result = Validator::new().check(&ReadingSubmission::default());
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 5);
        assert_eq!(result.fields_checked, 5);
    }

    #[test]
    fn test_non_finite_rejected() {
        let submission = ReadingSubmission {
            temperature: Some(f64::NAN),
            ..complete()
        };
        let err = Validator::new()
            .validate(&submission, "W-001", "NORMAL", Utc::now())
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotFinite { field: "temperature", .. }));
    }

    #[test]
    fn test_empty_worker_rejected() {
        let err = Validator::new()
            .validate(&complete(), " ", "NORMAL", Utc::now())
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat(_)));
    }

    #[test]
    fn test_fractions_truncated_and_out_of_range_kept() {
        let submission = ReadingSubmission {
            heart_rate: Some(250.9),
            gas: Some(-3.0),
            ..complete()
        };
        let reading = Validator::new()
            .validate(&submission, "W-001", "MINING", Utc::now())
            .unwrap();
        assert_eq!(reading.heart_rate, 250);
        assert_eq!(reading.gas, -3);
    }

    #[test]
    fn test_json_payload_with_text_fatigue() {
        let submission: ReadingSubmission = serde_json::from_str(
            r#"{"heart_rate": 110, "spo2": 93, "temperature": 37.4, "gas": 120, "fatigue": "Medium"}"#,
        )
        .unwrap();
        let reading = Validator::new()
            .validate(&submission, "W-002", "CHEMICAL", Utc::now())
            .unwrap();
        assert_eq!(reading.fatigue, Fatigue::Medium);
        assert_eq!(reading.spo2, 93);
    }

    #[test]
    fn test_unrecognized_fatigue_accepted() {
        let submission = ReadingSubmission {
            fatigue: Some(FatigueInput::Text("groggy".to_string())),
            ..complete()
        };
        let reading = Validator::new()
            .validate(&submission, "W-001", "NORMAL", Utc::now())
            .unwrap();
        assert_eq!(reading.fatigue, Fatigue::Unrecognized("groggy".to_string()));
    }

    proptest! {
        #[test]
        fn finite_submissions_always_validate(
            hr in -1.0e6f64..1.0e6,
            spo2 in -1.0e3f64..1.0e3,
            temp in -100.0f64..100.0,
            gas in -1.0e7f64..1.0e7,
            fatigue in -10.0f64..10.0,
        ) {
            let submission = ReadingSubmission {
                heart_rate: Some(hr),
                spo2: Some(spo2),
                temperature: Some(temp),
                gas: Some(gas),
                fatigue: Some(FatigueInput::Ordinal(fatigue)),
            };
            let reading = Validator::new().validate(&submission, "W-009", "NORMAL", Utc::now());
            prop_assert!(reading.is_ok());
            prop_assert!(Validator::new().check(&submission).valid);
        }
    }
}
