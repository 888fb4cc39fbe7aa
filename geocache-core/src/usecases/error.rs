use crate::{cancel::Interrupt, db};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("The query is invalid")]
    InvalidQuery,
    #[error(transparent)]
    Store(#[from] db::Error),
    #[error("Could not store the record of '{query}' ({attempts} attempt(s))")]
    WriteFailed {
        query: String,
        attempts: u32,
        #[source]
        source: db::Error,
    },
    #[error("The resolution has been cancelled")]
    Cancelled,
    #[error("The deadline of the resolution has been exceeded")]
    DeadlineExceeded,
}

impl From<Interrupt> for Error {
    fn from(from: Interrupt) -> Self {
        match from {
            Interrupt::Cancelled => Self::Cancelled,
            Interrupt::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}
