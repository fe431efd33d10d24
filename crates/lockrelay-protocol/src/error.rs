//! Error types for the protocol layer.
//!
//! Each crate in Lockrelay defines its own error enum. When you see a
//! `ProtocolError`, the problem is in framing or field decoding — not in
//! networking or room management.

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The buffer ended before the field we were reading did.
    /// Covers both truncated datagrams and corrupt length prefixes.
    #[error("truncated payload: needed {needed} more bytes, {remaining} left")]
    Truncated {
        /// Bytes the current field still required.
        needed: usize,
        /// Bytes actually left in the buffer.
        remaining: usize,
    },

    /// The opcode field doesn't name any message we know.
    /// Per the error taxonomy this is a protocol error: drop and log.
    #[error("unknown opcode {0}")]
    UnknownOpcode(i32),

    /// A packet was decoded with one opcode and then read as a message
    /// belonging to another. Always a caller bug, surfaced as an error so
    /// a bad dispatch table can't silently misparse fields.
    #[error("opcode mismatch: packet is {actual:?}, tried to read {expected:?}")]
    OpcodeMismatch {
        /// The opcode the packet carries.
        actual: crate::Opcode,
        /// The opcode of the message type the caller asked for.
        expected: crate::Opcode,
    },

    /// The declared payload length is negative or beyond [`MAX_PAYLOAD`].
    ///
    /// [`MAX_PAYLOAD`]: crate::MAX_PAYLOAD
    #[error("invalid payload length {0}")]
    InvalidLength(i64),

    /// A string field was not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Bytes were left over after the message's last field.
    /// A well-formed peer never sends trailing garbage.
    #[error("{0} trailing bytes after message body")]
    TrailingBytes(usize),
}
