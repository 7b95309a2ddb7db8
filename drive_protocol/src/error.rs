//! Public error taxonomy.
//!
//! Internal plumbing uses `anyhow::Error`; `DriveError` is the narrow,
//! typed surface exposed at public API boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("crypto operation failed: {0}")]
    CryptoFailed(String),

    #[error("network operation failed: {0}")]
    NetworkFailed(#[source] anyhow::Error),

    #[error("operation invoked after dispose()")]
    ConcurrencyTerminated,
}

pub type DriveResult<T> = Result<T, DriveError>;

impl DriveError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn crypto_failed(msg: impl Into<String>) -> Self {
        Self::CryptoFailed(msg.into())
    }
}
