//! XZ stream header and footer.
//!
//! Based on the XZ file format specification:
//! <https://tukaani.org/xz/xz-file-format.txt>
//!
//! ```text
//! Header: magic (6) | flags (2) | CRC32 of flags (4)
//! Footer: CRC32 of size+flags (4) | backward size (4) | flags (2) | "YZ"
//! ```

use oxixz_core::crc::Crc32;
use oxixz_core::{Result, XzError};
use std::fmt;

/// XZ magic bytes: 0xFD, '7', 'z', 'X', 'Z', 0x00
pub const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];

/// XZ footer magic bytes: 'Y', 'Z'
pub const XZ_FOOTER_MAGIC: [u8; 2] = [0x59, 0x5A];

/// Size of the stream header and of the stream footer.
pub const STREAM_HEADER_SIZE: usize = 12;

/// Largest check id the format defines.
pub const CHECK_ID_MAX: u8 = 0x0F;

/// Check sizes by id. Reserved ids have fixed sizes so they can be skipped.
const CHECK_SIZES: [usize; 16] = [0, 4, 4, 4, 8, 8, 8, 16, 16, 16, 32, 32, 32, 64, 64, 64];

/// Integrity check stored after every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CheckKind {
    /// No check.
    None,
    /// CRC-32.
    Crc32,
    /// CRC-64.
    Crc64,
    /// SHA-256.
    Sha256,
    /// An id the format reserves; only its size is known.
    Reserved(u8),
}

impl CheckKind {
    /// Map a check id to its kind. Ids above 15 are invalid.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Crc32),
            0x04 => Some(Self::Crc64),
            0x0A => Some(Self::Sha256),
            id if id <= CHECK_ID_MAX => Some(Self::Reserved(id)),
            _ => None,
        }
    }

    /// The id stored in stream flags.
    pub fn id(self) -> u8 {
        match self {
            CheckKind::None => 0x00,
            CheckKind::Crc32 => 0x01,
            CheckKind::Crc64 => 0x04,
            CheckKind::Sha256 => 0x0A,
            CheckKind::Reserved(id) => id,
        }
    }

    /// Size of the check field in bytes.
    pub fn size(self) -> usize {
        CHECK_SIZES[self.id() as usize]
    }

    /// Whether this decoder can verify the check.
    pub fn is_supported(self) -> bool {
        !matches!(self, CheckKind::Reserved(_))
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::None => f.write_str("None"),
            CheckKind::Crc32 => f.write_str("CRC32"),
            CheckKind::Crc64 => f.write_str("CRC64"),
            CheckKind::Sha256 => f.write_str("SHA-256"),
            CheckKind::Reserved(id) => write!(f, "Unknown-{id}"),
        }
    }
}

/// Parse a 12-byte stream header and return its check kind.
///
/// Bad magic is a format error, a flags CRC mismatch is a data error, and
/// non-zero reserved flags are an options error.
pub fn parse_stream_header(bytes: &[u8]) -> Result<CheckKind> {
    let magic = &bytes[..XZ_MAGIC.len()];
    if magic != XZ_MAGIC {
        return Err(XzError::invalid_magic(XZ_MAGIC, magic));
    }

    let flags = &bytes[6..8];
    let stored = le_u32(&bytes[8..12]);
    let computed = Crc32::compute(flags);
    if stored != computed {
        return Err(XzError::crc_mismatch(
            "Stream header CRC32",
            stored as u64,
            computed as u64,
        ));
    }

    if flags[0] != 0x00 {
        return Err(XzError::unsupported(format!(
            "stream flags {:#04x} {:#04x}",
            flags[0], flags[1]
        )));
    }
    CheckKind::from_id(flags[1])
        .ok_or_else(|| XzError::unsupported(format!("check id {:#04x}", flags[1])))
}

/// Validate a 12-byte stream footer against what the decoder has seen.
///
/// `index_size` is the size of the index without its CRC32. A wrong magic is
/// a format error; every other mismatch is a data error.
pub fn parse_stream_footer(bytes: &[u8], index_size: u64, check: CheckKind) -> Result<()> {
    if bytes[10..12] != XZ_FOOTER_MAGIC {
        return Err(XzError::invalid_magic(XZ_FOOTER_MAGIC, &bytes[10..12]));
    }

    let stored = le_u32(&bytes[..4]);
    let computed = Crc32::compute(&bytes[4..10]);
    if stored != computed {
        return Err(XzError::crc_mismatch(
            "Stream footer CRC32",
            stored as u64,
            computed as u64,
        ));
    }

    // Backward size is stored as (real index size / 4) - 1, where the real
    // size includes the CRC32.
    let backward = le_u32(&bytes[4..8]) as u64;
    if index_size >> 2 != backward {
        return Err(XzError::size_mismatch(
            "Index",
            (backward + 1) * 4,
            index_size + 4,
        ));
    }

    if bytes[8] != 0x00 || bytes[9] != check.id() {
        return Err(XzError::corrupted(
            "stream footer flags differ from the header",
        ));
    }
    Ok(())
}

/// Read a little-endian u32 from the first four bytes of `bytes`.
pub(crate) fn le_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxixz_core::ErrorKind;

    fn header(check: u8) -> Vec<u8> {
        let mut bytes = XZ_MAGIC.to_vec();
        bytes.extend_from_slice(&[0x00, check]);
        bytes.extend_from_slice(&Crc32::compute(&[0x00, check]).to_le_bytes());
        bytes
    }

    fn footer(backward: u32, check: u8) -> Vec<u8> {
        let mut tail = backward.to_le_bytes().to_vec();
        tail.extend_from_slice(&[0x00, check]);
        let mut bytes = Crc32::compute(&tail).to_le_bytes().to_vec();
        bytes.extend_from_slice(&tail);
        bytes.extend_from_slice(&XZ_FOOTER_MAGIC);
        bytes
    }

    #[test]
    fn test_check_sizes() {
        assert_eq!(CheckKind::None.size(), 0);
        assert_eq!(CheckKind::Crc32.size(), 4);
        assert_eq!(CheckKind::Crc64.size(), 8);
        assert_eq!(CheckKind::Sha256.size(), 32);
        assert_eq!(CheckKind::Reserved(0x02).size(), 4);
        assert_eq!(CheckKind::Reserved(0x0F).size(), 64);
        assert_eq!(CheckKind::from_id(0x10), None);
        assert_eq!(CheckKind::from_id(0x0A), Some(CheckKind::Sha256));
        assert!(!CheckKind::Reserved(0x07).is_supported());
    }

    #[test]
    fn test_check_display() {
        assert_eq!(CheckKind::Crc64.to_string(), "CRC64");
        assert_eq!(CheckKind::Reserved(5).to_string(), "Unknown-5");
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_stream_header(&header(0x04)).expect("valid"), CheckKind::Crc64);
        assert_eq!(
            parse_stream_header(&header(0x03)).expect("valid"),
            CheckKind::Reserved(3)
        );
    }

    #[test]
    fn test_header_errors() {
        let mut bad_magic = header(0x01);
        bad_magic[1] = b'8';
        assert_eq!(parse_stream_header(&bad_magic).unwrap_err().kind(), ErrorKind::Format);

        let mut bad_crc = header(0x01);
        bad_crc[11] ^= 0xFF;
        assert_eq!(parse_stream_header(&bad_crc).unwrap_err().kind(), ErrorKind::Data);

        // Valid CRC over flags with a reserved bit set.
        let mut reserved = XZ_MAGIC.to_vec();
        reserved.extend_from_slice(&[0x01, 0x01]);
        reserved.extend_from_slice(&Crc32::compute(&[0x01, 0x01]).to_le_bytes());
        assert_eq!(parse_stream_header(&reserved).unwrap_err().kind(), ErrorKind::Options);

        let mut big_check = XZ_MAGIC.to_vec();
        big_check.extend_from_slice(&[0x00, 0x10]);
        big_check.extend_from_slice(&Crc32::compute(&[0x00, 0x10]).to_le_bytes());
        assert_eq!(parse_stream_header(&big_check).unwrap_err().kind(), ErrorKind::Options);
    }

    #[test]
    fn test_parse_footer() {
        // Index of 8 bytes plus CRC32: backward size 2.
        assert!(parse_stream_footer(&footer(2, 0x01), 8, CheckKind::Crc32).is_ok());

        let err = parse_stream_footer(&footer(3, 0x01), 8, CheckKind::Crc32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);

        let err = parse_stream_footer(&footer(2, 0x04), 8, CheckKind::Crc32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);

        let mut bad_magic = footer(2, 0x01);
        bad_magic[11] = b'X';
        let err = parse_stream_footer(&bad_magic, 8, CheckKind::Crc32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(err, XzError::InvalidMagic { .. }));

        let mut bad_crc = footer(2, 0x01);
        bad_crc[0] ^= 1;
        let err = parse_stream_footer(&bad_crc, 8, CheckKind::Crc32).unwrap_err();
        assert!(matches!(err, XzError::CrcMismatch { .. }));
    }
}
