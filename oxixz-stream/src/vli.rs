//! Variable-length integers.
//!
//! Seven data bits per byte, least significant group first, with the top
//! bit set on every byte but the last. At most nine bytes (63 bits), and the
//! last byte of a multi-byte value may not be zero.

use oxixz_core::{Result, XzError};

/// Most bytes a VLI may occupy.
pub const VLI_BYTES_MAX: u32 = 9;

/// Resumable VLI accumulator.
#[derive(Debug, Clone, Default)]
pub struct VliDecoder {
    value: u64,
    /// Bit position of the next group; zero between values.
    shift: u32,
}

impl VliDecoder {
    /// Create an idle decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last completed value.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Continue decoding from `input[*pos..]`.
    ///
    /// Returns `Ok(true)` once a value is complete, `Ok(false)` when input
    /// ran out first.
    pub fn decode(&mut self, input: &[u8], pos: &mut usize) -> Result<bool> {
        if self.shift == 0 {
            self.value = 0;
        }

        while let Some(&byte) = input.get(*pos) {
            *pos += 1;
            self.value |= ((byte & 0x7F) as u64) << self.shift;

            if byte & 0x80 == 0 {
                if byte == 0 && self.shift != 0 {
                    return Err(XzError::corrupted("non-minimal variable-length integer"));
                }
                self.shift = 0;
                return Ok(true);
            }

            self.shift += 7;
            if self.shift == 7 * VLI_BYTES_MAX {
                return Err(XzError::corrupted("variable-length integer too long"));
            }
        }

        Ok(false)
    }
}
