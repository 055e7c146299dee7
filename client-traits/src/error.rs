use thiserror::Error;

/// Errors a storage client reports to the bridge.
///
/// This enumeration is closed on purpose: the boundary layer classifies each
/// variant into a stable numeric code exactly once, so a client must map its
/// internal failures onto these sentinels before returning. Anything that has
/// no sentinel belongs in `Internal`, which preserves the original message
/// for diagnostics.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A streaming read reached the end of the object data.
    ///
    /// Not fatal: the bytes returned by earlier reads remain valid.
    #[error("end of stream")]
    EndOfStream,

    /// The operation observed its cancellation signal before completing.
    #[error("operation canceled")]
    Canceled,

    #[error("too many requests: {0}")]
    RateLimited(String),

    #[error("bandwidth limit exceeded: {0}")]
    BandwidthLimitExceeded(String),

    #[error("bucket name invalid: {0:?}")]
    BucketNameInvalid(String),

    #[error("bucket already exists: {0:?}")]
    BucketAlreadyExists(String),

    #[error("bucket not empty: {0:?}")]
    BucketNotEmpty(String),

    #[error("bucket not found: {0:?}")]
    BucketNotFound(String),

    #[error("object key invalid: {0:?}")]
    ObjectKeyInvalid(String),

    #[error("object not found: {0:?}")]
    ObjectNotFound(String),

    /// The upload was already committed or aborted.
    #[error("upload already done: {0:?}")]
    UploadAlreadyDone(String),

    /// Catch-all for failures without a dedicated sentinel.
    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_messages_carry_context() {
        let err = ClientError::BucketNotFound("photos".to_string());
        assert_eq!(err.to_string(), "bucket not found: \"photos\"");

        let err = ClientError::Internal("satellite unreachable".to_string());
        assert_eq!(err.to_string(), "satellite unreachable");
    }
}
