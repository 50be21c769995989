//! Error types for vocalis-tts

use thiserror::Error;
use vocalis_core::Error as CoreError;

/// A specific constraint a candidate configuration violated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("Missing required field '{field}'")]
    MissingField { field: String },

    #[error("Field '{field}' out of range: {value} (expected {expected})")]
    OutOfRange {
        field: String,
        value: f64,
        expected: String,
    },

    #[error("Invalid emotion configuration: {0}")]
    InvalidEmotionConfig(String),

    #[error("Extension key '{key}' collides with a reserved attribute")]
    ReservedField { key: String },

    #[error("Provider is immutable (current '{current}', requested '{requested}')")]
    ProviderImmutable { current: String, requested: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl Violation {
    pub fn missing(field: impl Into<String>) -> Self {
        Violation::MissingField { field: field.into() }
    }

    pub fn out_of_range(field: impl Into<String>, value: f64, expected: impl Into<String>) -> Self {
        Violation::OutOfRange {
            field: field.into(),
            value,
            expected: expected.into(),
        }
    }

    pub fn emotion(reason: impl Into<String>) -> Self {
        Violation::InvalidEmotionConfig(reason.into())
    }
}

/// Config store and service errors
#[derive(Error, Debug)]
pub enum TtsConfigError {
    #[error("Configuration '{0}' not found")]
    NotFound(String),

    #[error("Configuration '{0}' is disabled and cannot be activated")]
    Disabled(String),

    #[error("Configuration '{0}' already exists")]
    AlreadyExists(String),

    #[error("Invalid configuration '{id}': {violation}")]
    Invalid { id: String, violation: Violation },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Settings error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

/// Coarse classification callers can match on without digging into payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Disabled,
    AlreadyExists,
    MissingField,
    OutOfRange,
    InvalidEmotionConfig,
    ReservedField,
    ProviderImmutable,
    InvalidValue,
    Backend,
    Config,
}

impl TtsConfigError {
    pub fn invalid(id: impl Into<String>, violation: Violation) -> Self {
        TtsConfigError::Invalid {
            id: id.into(),
            violation,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TtsConfigError::NotFound(_) => ErrorKind::NotFound,
            TtsConfigError::Disabled(_) => ErrorKind::Disabled,
            TtsConfigError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            TtsConfigError::Invalid { violation, .. } => match violation {
                Violation::MissingField { .. } => ErrorKind::MissingField,
                Violation::OutOfRange { .. } => ErrorKind::OutOfRange,
                Violation::InvalidEmotionConfig(_) => ErrorKind::InvalidEmotionConfig,
                Violation::ReservedField { .. } => ErrorKind::ReservedField,
                Violation::ProviderImmutable { .. } => ErrorKind::ProviderImmutable,
                Violation::InvalidValue { .. } => ErrorKind::InvalidValue,
            },
            TtsConfigError::Backend(_) => ErrorKind::Backend,
            TtsConfigError::Config(_) | TtsConfigError::Core(_) => ErrorKind::Config,
        }
    }

    /// The violated constraint, for validation failures
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            TtsConfigError::Invalid { violation, .. } => Some(violation),
            _ => None,
        }
    }
}

impl From<TtsConfigError> for CoreError {
    fn from(err: TtsConfigError) -> Self {
        match err {
            TtsConfigError::NotFound(id) => CoreError::NotFound(format!("TTS config '{}'", id)),
            TtsConfigError::AlreadyExists(id) => CoreError::Conflict(format!("TTS config '{}'", id)),
            TtsConfigError::Backend(msg) => CoreError::Backend(msg),
            TtsConfigError::Core(inner) => inner,
            other => CoreError::Validation(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TtsConfigError>;
