use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("--size requires --rank")]
    SizeWithoutRank,

    #[error("Inversion exited with {status}")]
    InversionFailed { status: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Library(#[from] aniso1d::Error),
}
