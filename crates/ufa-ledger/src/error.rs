use ufa_store::StoreError;

use crate::validation::ValidationReport;

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A business rule rejected the call before anything was written.
    #[error("validation failure: {0}")]
    Validation(ValidationReport),

    /// Submitted or stored bytes could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[source] StoreError),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record already exists: {0}")]
    AlreadyExists(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("{function}: missing argument <{argument}>")]
    MissingArgument {
        function: String,
        argument: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Codec { .. } | StoreError::KindMismatch { .. } => Self::Decode(err),
            other => Self::Store(other),
        }
    }
}

impl LedgerError {
    /// The validation report, if this is a business-rule rejection.
    pub fn as_validation(&self) -> Option<&ValidationReport> {
        match self {
            Self::Validation(report) => Some(report),
            _ => None,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
