use thiserror::Error;

/// The reason a buffer failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// A digit was required: in a string length prefix, in an integer
    /// literal, or at a dictionary key position (keys must be strings).
    #[error("expected digit")]
    ExpectedDigit,

    /// A string length prefix was not terminated by `:`.
    #[error("expected colon")]
    ExpectedColon,

    /// The input ended before the value was complete.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A value opener (`d`, `l`, `i` or a digit) was required.
    #[error("expected value")]
    ExpectedValue,

    /// Nesting exceeded the decoder's depth limit.
    #[error("nesting depth limit exceeded")]
    DepthExceeded,

    /// The decoder's token limit was exceeded, or the input is too large
    /// for the token representation.
    #[error("token limit exceeded")]
    LimitExceeded,

    /// An integer literal's magnitude is outside the signed 64-bit range.
    #[error("integer overflow")]
    Overflow,
}

/// A decode failure: what went wrong and the byte offset where it was
/// detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at offset {position}")]
pub struct DecodeError {
    /// The error category.
    pub kind: ErrorKind,
    /// Byte offset into the input where the failure was detected.
    pub position: usize,
}

impl DecodeError {
    pub(crate) fn new(kind: ErrorKind, position: usize) -> Self {
        DecodeError { kind, position }
    }
}
