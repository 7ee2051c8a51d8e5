use std::{io, path::PathBuf};

use thiserror::Error;

use crate::session::SessionState;

#[derive(Error, Debug)]
pub enum PomoError {
    #[error("Cannot load \"{}\" for analysis.", path.display())]
    LogUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed timestamp on line {line}: {value:?}")]
    MalformedTimestamp { line: usize, value: String },

    #[error("Could not write to log file {}.", path.display())]
    LogWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Session already finished ({0:?}); start a new controller")]
    SessionFinished(SessionState),

    #[error("Terminal display error: {0}")]
    Terminal(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PomoError>;
