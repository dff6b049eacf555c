use thiserror::Error;

/// Errors raised by a [`crate::Store`] implementation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("address already registered")]
    AlreadyExists,

    #[error("store error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
