/// ==============================================================================================
/// ===================================== Error Taxonomy =========================================
/// ==============================================================================================
//
// One variant per row of the engine's error table: shape/type problems are caught once at
// construction (`invalid_input`), everything else can only surface mid-run.

use thiserror::Error;

/// Machine-readable error kind, independent of the human-readable message carried alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    InconsistentEvent,
    PropensityError,
    StoichiometryViolation,
    Cancelled,
    Internal,
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("inconsistent event at node {node} (time {time}): {message}")]
    InconsistentEvent {
        node: usize,
        time: i64,
        message: String,
    },

    #[error("propensity {transition} returned an invalid value {value} at node {node}, t={t}")]
    PropensityError {
        transition: usize,
        node: usize,
        t: f64,
        value: f64,
    },

    #[error("firing transition {transition} at node {node} drove compartment {compartment} negative (value {value})")]
    StoichiometryViolation {
        node: usize,
        transition: usize,
        compartment: usize,
        value: i64,
    },

    #[error("simulation cancelled")]
    Cancelled,

    #[error("internal invariant violated: {message}")]
    Internal { message: String },
}

impl SimError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        SimError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SimError::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::InvalidInput { .. } => ErrorKind::InvalidInput,
            SimError::InconsistentEvent { .. } => ErrorKind::InconsistentEvent,
            SimError::PropensityError { .. } => ErrorKind::PropensityError,
            SimError::StoichiometryViolation { .. } => ErrorKind::StoichiometryViolation,
            SimError::Cancelled => ErrorKind::Cancelled,
            SimError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether this error can only happen mid-run (i.e. after some output may already be
    /// recorded), as opposed to at construction time.
    pub fn is_runtime(&self) -> bool {
        !matches!(self, SimError::InvalidInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

/// A run that failed partway through still carries whatever it managed to record.
#[derive(Debug)]
pub struct Partial<T> {
    pub output: T,
    pub error: SimError,
}
