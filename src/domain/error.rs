use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("required field `{field}` is missing or empty")]
    MissingField { field: &'static str },
    #[error("`{value}` is not a valid site path: {reason}")]
    InvalidPath { value: String, reason: &'static str },
}

impl DomainError {
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub fn invalid_path(value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            value: value.into(),
            reason,
        }
    }
}
