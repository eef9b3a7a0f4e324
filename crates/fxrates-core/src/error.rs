use thiserror::Error;

/// Client-input validation errors raised before any store or feed call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("currency code cannot be empty")]
    EmptyCurrencyCode,
    #[error("currency code must be exactly 3 letters, got {len} characters")]
    CurrencyCodeLength { len: usize },
    #[error("currency code contains invalid character '{ch}'")]
    CurrencyCodeInvalidChar { ch: char },

    #[error("date must be in DD/MM/YYYY form: '{value}'")]
    InvalidDate { value: String },

    #[error("rate nominal must be a positive unit count, got {nominal}")]
    NominalNotPositive { nominal: i64 },
    #[error("rate name cannot be empty")]
    EmptyRateName,
}
