//! # OxiXZ LZMA
//!
//! Streaming LZMA and LZMA2 decoding.
//!
//! Every decoder in this crate is resumable: a call stops when either the
//! input or the output runs out, possibly in the middle of a chunk header,
//! the range coder's init bytes, or a match, and the next call continues
//! from exactly that point.
//!
//! ## Layers
//!
//! - [`range_coder`]: binary decisions and bit trees from the compressed bytes
//! - [`dict`]: the sliding window, with three storage strategies
//! - [`decoder`]: the LZMA literal/match state machine
//! - [`lzma2`]: LZMA2 chunk framing and resets
//!
//! ## Usage
//!
//! ```rust
//! use oxixz_lzma::decode_lzma2;
//!
//! // One uncompressed chunk with a dictionary reset, then the end marker.
//! let data = [0x01, 0x00, 0x01, b'h', b'i', 0x00];
//! let out = decode_lzma2(&data, 0)?;
//! assert_eq!(out, b"hi");
//! # Ok::<(), oxixz_core::XzError>(())
//! ```
//!
//! ## Dictionary strategies
//!
//! | Storage         | Memory                         | Calls          |
//! |-----------------|--------------------------------|----------------|
//! | [`Direct`]      | none, writes into the output   | exactly one    |
//! | [`Preallocated`]| `dict_max`, at construction    | any number     |
//! | [`Growable`]    | each stream's declared size    | any number     |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decoder;
pub mod dict;
pub mod lzma2;
pub mod model;
pub mod range_coder;

// Re-exports
pub use decoder::LzmaDecoder;
pub use dict::{DictMode, DictStorage, Dictionary, Direct, Growable, Preallocated};
pub use lzma2::{LZMA_IN_REQUIRED, Lzma2Decoder, decode_lzma2, dict_size_from_props};
pub use model::{LzmaModel, LzmaProperties, State};
pub use range_coder::{RangeDecoder, RcInput};
