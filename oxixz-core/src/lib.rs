//! # OxiXZ Core
//!
//! Core components for the OxiXZ decompressor.
//!
//! This crate provides the building blocks shared by every decoding layer:
//!
//! - [`buffer`]: Input/output cursors passed into every decode call
//! - [`crc`]: CRC-32 and CRC-64 checksums
//! - [`traits`]: The streaming [`Decompressor`] trait
//! - [`error`]: Error types and their coarse [`ErrorKind`] classification
//!
//! ## Architecture
//!
//! OxiXZ is designed as a layered decoder stack:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L4: Front ends                                          │
//! │     oxixz CLI, io::Read adapter, one-shot helpers      │
//! ├─────────────────────────────────────────────────────────┤
//! │ L3: Container                                           │
//! │     XZ stream header, blocks, index, footer, checks    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     LZMA2 chunks, LZMA, range decoder, dictionary      │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Core (this crate)                                   │
//! │     InOutBuffer, CRC, errors                           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxixz_core::buffer::InOutBuffer;
//! use oxixz_core::crc::Crc32;
//!
//! let input = [1u8, 2, 3];
//! let mut output = [0u8; 8];
//! let mut buf = InOutBuffer::new(&input, &mut output);
//! assert_eq!(buf.read_byte(), Some(1));
//! assert_eq!(buf.in_remaining(), 2);
//!
//! let crc = Crc32::compute(b"Hello, World!");
//! assert_eq!(crc, 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod crc;
pub mod error;
pub mod traits;

// Re-exports for convenience
pub use buffer::InOutBuffer;
pub use crc::{Crc32, Crc64, crc32};
pub use error::{ErrorKind, Result, XzError};
pub use traits::{DecompressStatus, Decompressor};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::buffer::InOutBuffer;
    pub use crate::crc::{Crc32, Crc64};
    pub use crate::error::{ErrorKind, Result, XzError};
    pub use crate::traits::{DecompressStatus, Decompressor};
}
