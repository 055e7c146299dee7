use client_traits::ClientError;
use thiserror::Error;

/// Failures the bridge itself detects before or while calling the client.
///
/// Structural problems (null pointers, unknown or mistyped handles, bad
/// argument encodings) are caught at the boundary and never reach the
/// storage client; everything the client reports is wrapped unchanged in
/// `Client` so classification sees the original value.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("required argument is NULL: {0}")]
    NullArgument(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid handle: {0}")]
    InvalidHandle(&'static str),

    #[error(transparent)]
    Client(#[from] ClientError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
