//! Crate-level error taxonomy. `Display` output is the failure reason shown
//! to the user.

use crate::github::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unusable configuration; fatal before any check run exists.
    #[error("{0}")]
    Environment(String),

    /// The compiler process could not be started.
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    /// Commit resolution already failed earlier in this invocation.
    #[error("{0}")]
    Unresolved(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Environment errors map to the config-error exit code.
    pub fn is_environment(&self) -> bool {
        matches!(self, Error::Environment(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
