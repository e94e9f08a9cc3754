use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Accumulated field-keyed validation failures for one set of loan terms.
///
/// Kept in the order the checks run so callers can render stable
/// field-level messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// First message recorded for a field, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", joined)
    }
}

#[derive(Debug, Error)]
pub enum LoanEngineError {
    #[error("Invalid loan terms: {0}")]
    InvalidTerms(ValidationErrors),

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Schedule generation failed for loan '{loan_id}': {reason}")]
    ScheduleGeneration { loan_id: String, reason: String },

    #[error("Unknown loan: {0}")]
    UnknownLoan(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for LoanEngineError {
    fn from(e: serde_json::Error) -> Self {
        LoanEngineError::SerializationError(e.to_string())
    }
}
