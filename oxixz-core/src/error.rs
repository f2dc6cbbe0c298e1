//! Error types for OxiXZ operations.
//!
//! Every failure carries a coarse [`ErrorKind`] so callers can tell a file
//! that is not XZ at all from a valid file using options this decoder does not
//! support, from one that is damaged.

use std::fmt;
use std::io;
use thiserror::Error;

/// Coarse classification of a decoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input does not start with the XZ stream magic.
    Format,
    /// A well-formed header requests an unsupported feature, or more
    /// dictionary than the decoder was configured to allow.
    Options,
    /// Integrity or structural violation.
    Data,
    /// Dictionary allocation failed.
    Memory,
    /// The caller's output buffer cannot hold the result of a one-shot call.
    Buffer,
    /// Failure reported by an underlying reader or writer.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Format => "format",
            ErrorKind::Options => "options",
            ErrorKind::Data => "data",
            ErrorKind::Memory => "memory",
            ErrorKind::Buffer => "buffer",
            ErrorKind::Io => "i/o",
        };
        f.write_str(name)
    }
}

/// The main error type for OxiXZ operations.
#[derive(Debug, Error)]
pub enum XzError {
    /// I/O error from underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic number in the stream header.
    #[error("Invalid magic number: expected {expected:02x?}, found {found:02x?}")]
    InvalidMagic {
        /// Expected magic bytes.
        expected: Vec<u8>,
        /// Actual magic bytes found.
        found: Vec<u8>,
    },

    /// A header field requests an unsupported feature.
    #[error("Unsupported options: {message}")]
    UnsupportedOptions {
        /// Description of the unsupported option.
        message: String,
    },

    /// The stream declares a dictionary larger than the decoder may allocate.
    #[error("Dictionary of {needed} bytes exceeds the limit of {limit} bytes")]
    DictionaryTooLarge {
        /// Dictionary size declared by the stream.
        needed: u64,
        /// Configured maximum.
        limit: u64,
    },

    /// Dictionary allocation failed.
    #[error("Out of memory: failed to allocate {requested} bytes")]
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
    },

    /// A stored checksum does not match the computed one.
    #[error("{what} mismatch: expected {expected:#x}, computed {computed:#x}")]
    CrcMismatch {
        /// Which checksum failed.
        what: &'static str,
        /// Value stored in the stream.
        expected: u64,
        /// Value computed from the data.
        computed: u64,
    },

    /// A SHA-256 block check does not match.
    #[error("SHA-256 mismatch in block {block}")]
    DigestMismatch {
        /// Zero-based index of the failing block.
        block: u64,
    },

    /// Corrupted or truncated data.
    #[error("Corrupted data: {message}")]
    CorruptedData {
        /// Description of the corruption.
        message: String,
    },

    /// Invalid distance in an LZMA back-reference.
    #[error("Invalid back-reference distance: {distance} exceeds history size {history_size}")]
    InvalidDistance {
        /// The invalid distance value (zero-based).
        distance: usize,
        /// Number of bytes of history available.
        history_size: usize,
    },

    /// A size declared in a header disagrees with the decoded data.
    #[error("{what} size mismatch: declared {declared}, actual {actual}")]
    SizeMismatch {
        /// Which size disagreed.
        what: &'static str,
        /// Declared size.
        declared: u64,
        /// Observed size.
        actual: u64,
    },

    /// Output buffer too small for a one-shot call.
    #[error("Buffer too small: output of {available} bytes cannot hold the decoded stream")]
    BufferTooSmall {
        /// Number of bytes available.
        available: usize,
    },

    /// The decoder already failed and must be reset before reuse.
    #[error("Decoder is in a failed state ({kind} error); reset it before reuse")]
    Failed {
        /// Kind of the original failure.
        kind: ErrorKind,
    },
}

/// Result type alias for OxiXZ operations.
pub type Result<T> = std::result::Result<T, XzError>;

impl XzError {
    /// Create an invalid magic error.
    pub fn invalid_magic(expected: impl Into<Vec<u8>>, found: impl Into<Vec<u8>>) -> Self {
        Self::InvalidMagic {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an unsupported options error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOptions {
            message: message.into(),
        }
    }

    /// Create a dictionary-too-large error.
    pub fn dictionary_too_large(needed: u64, limit: u64) -> Self {
        Self::DictionaryTooLarge { needed, limit }
    }

    /// Create an out of memory error.
    pub fn out_of_memory(requested: usize) -> Self {
        Self::OutOfMemory { requested }
    }

    /// Create a CRC mismatch error.
    pub fn crc_mismatch(what: &'static str, expected: u64, computed: u64) -> Self {
        Self::CrcMismatch {
            what,
            expected,
            computed,
        }
    }

    /// Create a corrupted data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::CorruptedData {
            message: message.into(),
        }
    }

    /// Create the error reported when input ends inside a stream.
    pub fn truncated() -> Self {
        Self::corrupted("unexpected end of input")
    }

    /// Create an invalid distance error.
    pub fn invalid_distance(distance: usize, history_size: usize) -> Self {
        Self::InvalidDistance {
            distance,
            history_size,
        }
    }

    /// Create a size mismatch error.
    pub fn size_mismatch(what: &'static str, declared: u64, actual: u64) -> Self {
        Self::SizeMismatch {
            what,
            declared,
            actual,
        }
    }

    /// Create a buffer too small error.
    pub fn buffer_too_small(available: usize) -> Self {
        Self::BufferTooSmall { available }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            XzError::Io(_) => ErrorKind::Io,
            XzError::InvalidMagic { .. } => ErrorKind::Format,
            XzError::UnsupportedOptions { .. } | XzError::DictionaryTooLarge { .. } => {
                ErrorKind::Options
            }
            XzError::OutOfMemory { .. } => ErrorKind::Memory,
            XzError::CrcMismatch { .. }
            | XzError::DigestMismatch { .. }
            | XzError::CorruptedData { .. }
            | XzError::InvalidDistance { .. }
            | XzError::SizeMismatch { .. } => ErrorKind::Data,
            XzError::BufferTooSmall { .. } => ErrorKind::Buffer,
            XzError::Failed { kind } => *kind,
        }
    }

    /// Recover an `XzError` that was wrapped into an [`io::Error`].
    pub fn from_io(err: io::Error) -> Self {
        let is_wrapped = err
            .get_ref()
            .is_some_and(|inner| inner.downcast_ref::<XzError>().is_some());
        if !is_wrapped {
            return XzError::Io(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<XzError>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => XzError::Io(io::Error::other(other)),
            None => XzError::corrupted("lost wrapped error"),
        }
    }
}

impl From<XzError> for io::Error {
    fn from(err: XzError) -> Self {
        match err {
            XzError::Io(inner) => inner,
            XzError::BufferTooSmall { .. } => io::Error::new(io::ErrorKind::WriteZero, err),
            XzError::OutOfMemory { .. } => io::Error::new(io::ErrorKind::OutOfMemory, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
