//! Running block checks.

use crate::header::{CheckKind, le_u32};
use oxixz_core::crc::{Crc32, Crc64};
use oxixz_core::{Result, XzError};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
enum State {
    None,
    Crc32(Crc32),
    Crc64(Crc64),
    Sha256(Sha256),
    /// Reserved check id: the stored bytes are consumed but not verified.
    Skipped,
}

/// The integrity check of one block, fed with its uncompressed data.
#[derive(Debug, Clone)]
pub struct BlockCheck {
    kind: CheckKind,
    state: State,
}

impl BlockCheck {
    /// Start a check of the given kind.
    pub fn new(kind: CheckKind) -> Self {
        let state = match kind {
            CheckKind::None => State::None,
            CheckKind::Crc32 => State::Crc32(Crc32::new()),
            CheckKind::Crc64 => State::Crc64(Crc64::new()),
            CheckKind::Sha256 => State::Sha256(Sha256::new()),
            CheckKind::Reserved(_) => State::Skipped,
        };
        Self { kind, state }
    }

    /// Check kind.
    pub fn kind(&self) -> CheckKind {
        self.kind
    }

    /// Start over for the next block.
    pub fn reset(&mut self) {
        *self = Self::new(self.kind);
    }

    /// Feed uncompressed bytes.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            State::None | State::Skipped => {}
            State::Crc32(crc) => crc.update(data),
            State::Crc64(crc) => crc.update(data),
            State::Sha256(hasher) => hasher.update(data),
        }
    }

    /// Compare against the check field stored after block `block`, then
    /// reset for the next block.
    pub fn verify(&mut self, stored: &[u8], block: u64) -> Result<()> {
        let state = std::mem::replace(&mut self.state, State::None);
        self.reset();

        match state {
            State::None | State::Skipped => Ok(()),
            State::Crc32(crc) => {
                let expected = le_u32(stored);
                let computed = crc.finalize();
                if expected != computed {
                    return Err(XzError::crc_mismatch(
                        "Block CRC32",
                        expected as u64,
                        computed as u64,
                    ));
                }
                Ok(())
            }
            State::Crc64(crc) => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&stored[..8]);
                let expected = u64::from_le_bytes(raw);
                let computed = crc.finalize();
                if expected != computed {
                    return Err(XzError::crc_mismatch("Block CRC64", expected, computed));
                }
                Ok(())
            }
            State::Sha256(hasher) => {
                if hasher.finalize().as_slice() != &stored[..32] {
                    return Err(XzError::DigestMismatch { block });
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_check() {
        let mut check = BlockCheck::new(CheckKind::Crc32);
        check.update(b"123");
        check.update(b"456789");
        assert!(check.verify(&0xCBF4_3926u32.to_le_bytes(), 0).is_ok());

        // State was reset: an empty block has CRC 0.
        assert!(check.verify(&[0, 0, 0, 0], 1).is_ok());
    }

    #[test]
    fn test_crc64_mismatch() {
        let mut check = BlockCheck::new(CheckKind::Crc64);
        check.update(b"123456789");
        let err = check.verify(&[0u8; 8], 0).unwrap_err();
        assert!(matches!(
            err,
            XzError::CrcMismatch {
                computed: 0x995D_C9BB_DF19_39FA,
                ..
            }
        ));
    }

    #[test]
    fn test_sha256_check() {
        // SHA-256("abc")
        let digest = [
            0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae,
            0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61,
            0xf2, 0x00, 0x15, 0xad,
        ];
        let mut check = BlockCheck::new(CheckKind::Sha256);
        check.update(b"ab");
        check.update(b"c");
        assert!(check.verify(&digest, 0).is_ok());

        check.update(b"abd");
        let err = check.verify(&digest, 3).unwrap_err();
        assert!(matches!(err, XzError::DigestMismatch { block: 3 }));
    }

    #[test]
    fn test_reserved_check_is_skipped() {
        let mut check = BlockCheck::new(CheckKind::Reserved(0x02));
        check.update(b"anything");
        assert!(check.verify(&[1, 2, 3, 4], 0).is_ok());
    }
}
