//! # OxiXZ Stream
//!
//! The `.xz` container: stream header and footer, block headers, integrity
//! checks, the index, and concatenated streams.
//!
//! - [`XzDecoder`]: resumable decoder for one stream
//! - [`MultiStreamDecoder`]: concatenated streams with stream padding
//! - [`XzReader`]: [`std::io::Read`] adapter
//! - [`decompress`] / [`decompress_single`]: whole-buffer helpers, with
//!   `_with` variants taking a [`DecoderConfig`]
//!
//! ## Example
//!
//! ```rust
//! // An empty file compressed with a CRC64 check.
//! let data = [
//!     0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00, 0x04, 0xE6, 0xD6, 0xB4, 0x46,
//!     0x00, 0x00, 0x00, 0x00, 0x1C, 0xDF, 0x44, 0x21,
//!     0x1F, 0xB6, 0xF3, 0x7D, 0x01, 0x00, 0x00, 0x00, 0x00, 0x04, 0x59, 0x5A,
//! ];
//! let out = oxixz_stream::decompress(&data)?;
//! assert!(out.is_empty());
//! # Ok::<(), oxixz_core::XzError>(())
//! ```
//!
//! ## Checks
//!
//! CRC32, CRC64 and SHA-256 are verified. Reserved check ids are skipped
//! with a warning, or rejected under [`CheckPolicy::Reject`].
//!
//! ## Filters
//!
//! Blocks may run one branch-converter filter after LZMA2. None are built
//! in; register a [`PostFilter`] for each id your input uses.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod check;
pub mod config;
pub mod decoder;
pub mod filter;
pub mod header;
pub mod reader;
pub mod stats;
pub mod vli;

// Re-exports
pub use check::BlockCheck;
pub use config::{CheckPolicy, DEFAULT_DICT_MAX, DecoderConfig};
pub use decoder::XzDecoder;
pub use filter::{FilterSet, PostFilter};
pub use header::{CheckKind, XZ_MAGIC};
pub use reader::{
    MultiStreamDecoder, XzReader, decompress, decompress_single, decompress_single_with,
    decompress_with,
};
pub use stats::{BlockRecord, StreamStats};

pub use oxixz_core::{DecompressStatus, Decompressor, ErrorKind, Result, XzError};
pub use oxixz_lzma::{DictMode, Direct, Growable, Preallocated};
