//! Error types for the protocol layer.
//!
//! Script parsing is best-effort: callers that only want whatever could be
//! read use [`Codec::decode_partial`](crate::Codec::decode_partial) and treat
//! a `ProtocolError` as a diagnostic. Strict callers use
//! [`Codec::decode`](crate::Codec::decode) and get it as an `Err`.

/// Errors that can occur while reading a game script.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The input ended while a section was still open.
    #[error("unexpected end of script inside section [{section}]")]
    UnexpectedEof { section: String },

    /// A token appeared where the grammar does not allow it.
    ///
    /// `line` is 1-based.
    #[error("malformed script at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}
