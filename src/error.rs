//! Crate-level error type and `Result` alias for structured error handling.
//! Converts underlying I/O, EDI and elevation errors, and provides semantic
//! variants for parameter validation, work assignment and launch failures.
use std::path::PathBuf;

use thiserror::Error;

use crate::core::rank::WorkerState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("EDI reader error: {0}")]
    Edi(#[from] crate::io::EdiError),

    #[error("Elevation lookup error: {0}")]
    Elevation(#[from] crate::io::ElevationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid parameter: {key}={value}")]
    InvalidParameter { key: String, value: String },

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Malformed constraint row {line} in {path:?}: {reason}")]
    ConstraintRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("No layer depths found in previous model directory {0:?}")]
    NoModelLayers(PathBuf),

    #[error("Rank {rank} has no measurement file: only {available} discovered")]
    RankOutOfRange { rank: usize, available: usize },

    #[error("Failed to launch {program:?}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker halted at {state}: {source}")]
    Dispatch {
        state: WorkerState,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn invalid<V: std::fmt::Display>(key: &str, value: V) -> Self {
        Error::InvalidParameter {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// Wrap an error with the worker state at which the pipeline stopped.
    pub fn halted_at(self, state: WorkerState) -> Self {
        match self {
            already @ Error::Dispatch { .. } => already,
            other => Error::Dispatch {
                state,
                source: Box::new(other),
            },
        }
    }
}
