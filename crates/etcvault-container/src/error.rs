//! Error types for container parsing.

/// Errors from parsing a wire container.
///
/// [`Invalid`](ContainerError::Invalid) is special: it means the input has no
/// container shape at all, and callers that transform arbitrary values treat
/// it as "leave this string alone" rather than a failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    /// The input does not have container shape.
    #[error("it's not in container form (invalid)")]
    Invalid,

    /// The input had container shape but its payload is malformed.
    #[error("couldn't parse")]
    Parse,

    /// A variant parser was handed a container of another version.
    #[error("it's in different version")]
    DifferentVersion,

    /// The version tag is not one this codec knows.
    #[error("unknown version")]
    UnknownVersion,

    /// A base64 fragment of a V1 payload failed to decode.
    #[error("invalid base64 in payload: {0}")]
    Base64(#[from] base64::DecodeError),
}
