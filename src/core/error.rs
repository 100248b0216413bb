use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Tax configuration unavailable: {0}")]
    ConfigMissing(String),

    #[error("Unsupported province: {0}")]
    UnsupportedProvince(String),

    #[error("Invalid input {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl SimError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::ConfigMissing(e.to_string())
    }
}

pub type SimResult<T> = Result<T, SimError>;
