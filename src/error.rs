//! Error types for the fusion pipeline

use thiserror::Error;

use crate::sample::SensorKind;

/// A sample rejected at the collaborator boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("unknown sensor kind: {0}")]
    UnknownSensor(String),

    #[error("{kind:?} sample needs {expected} values, got {got}")]
    WrongArity {
        kind: SensorKind,
        expected: usize,
        got: usize,
    },

    #[error("{kind:?} sample contains a non-finite value")]
    NonFinite { kind: SensorKind },
}

/// Errors from the session controller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("session already running")]
    AlreadyRunning,

    #[error("session not running")]
    NotRunning,

    #[error("pipeline lock poisoned by a panicked holder")]
    Poisoned,

    #[error(transparent)]
    Sample(#[from] SampleError),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
