use thiserror::Error;

/// Error taxonomy exposed at the controller boundary. Front-ends map
/// each variant to a single, stable status code (HTTP or gRPC).
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("failed to decode request")]
    DecodeRequest,

    #[error("internal error")]
    Internal,
}

impl From<registry_core::Error> for Error {
    fn from(e: registry_core::Error) -> Self {
        match e {
            registry_core::Error::NotFound => Error::NotFound,
            registry_core::Error::AlreadyExists => Error::AlreadyExists,
            registry_core::Error::Storage(_) => Error::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
