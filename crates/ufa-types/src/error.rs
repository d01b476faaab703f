use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown submitter role: {0}")]
    UnknownRole(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
