use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayoffError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Unsolvable: {0}")]
    Unsolvable(String),

    #[error("Ambiguous product definition: {0}")]
    DomainAmbiguous(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PayoffError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PayoffError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PayoffError {
    fn from(e: serde_json::Error) -> Self {
        PayoffError::SerializationError(e.to_string())
    }
}
