//! Domain name errors.

use thiserror::Error;

/// Result type alias for name operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while validating or parsing a domain name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Label exceeds the maximum length of 63 bytes.
    #[error("label too long: {length} bytes exceeds maximum of 63")]
    LabelTooLong {
        /// Actual label length.
        length: usize,
    },

    /// Domain name exceeds the maximum wire length of 255 bytes.
    #[error("name too long: {length} bytes exceeds maximum of 255")]
    NameTooLong {
        /// Actual name length in wire format.
        length: usize,
    },

    /// Empty label in the middle of a domain name.
    #[error("empty label at position {position} (only the root label may be empty)")]
    EmptyLabel {
        /// Byte position of the empty label.
        position: usize,
    },

    /// Compression pointer in a stored name.
    ///
    /// Stored names must be uncompressed; pointers only make sense inside
    /// a full message.
    #[error("compression pointer at offset {offset} in stored name")]
    CompressedName {
        /// Byte offset of the pointer.
        offset: usize,
    },

    /// Bytes remain after the terminating root label.
    #[error("{remaining} trailing bytes after root label")]
    TrailingData {
        /// Number of trailing bytes.
        remaining: usize,
    },

    /// Invalid presentation-format input.
    #[error("invalid presentation format: {message}")]
    InvalidPresentation {
        /// Description of the problem.
        message: String,
    },
}
