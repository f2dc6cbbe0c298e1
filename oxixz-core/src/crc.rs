//! CRC (Cyclic Redundancy Check) implementations used by the XZ format.
//!
//! - **CRC-32 (ISO 3309)**: stream flags, block headers, index, and the
//!   default integrity check
//! - **CRC-64/ECMA-182**: optional integrity check
//!
//! ## Performance
//!
//! Both checksums use the "slicing-by-8" technique for data of 16 bytes or
//! more, processing 8 bytes per step with 8 pre-computed lookup tables. Shorter
//! inputs use a single table.
//!
//! ## Running values
//!
//! The container layer keeps CRCs as plain finalised `u32` values between
//! calls. [`crc32`] continues such a value over more bytes, so
//! `crc32(b, crc32(a, 0)) == crc32(ab, 0)`.

const CRC32_POLY: u32 = 0xEDB88320;
const CRC64_POLY: u64 = 0xC96C5795D7870F42;

/// Inputs shorter than this use the single-table loop.
const SLICE_THRESHOLD: usize = 16;

const fn crc32_tables() -> [[u32; 256]; 8] {
    let mut tables = [[0u32; 256]; 8];

    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC32_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        tables[0][i] = crc;
        i += 1;
    }

    let mut t = 1;
    while t < 8 {
        let mut i = 0usize;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = tables[0][(prev & 0xFF) as usize] ^ (prev >> 8);
            i += 1;
        }
        t += 1;
    }

    tables
}

const fn crc64_tables() -> [[u64; 256]; 8] {
    let mut tables = [[0u64; 256]; 8];

    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u64;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC64_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        tables[0][i] = crc;
        i += 1;
    }

    let mut t = 1;
    while t < 8 {
        let mut i = 0usize;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = tables[0][(prev & 0xFF) as usize] ^ (prev >> 8);
            i += 1;
        }
        t += 1;
    }

    tables
}

/// CRC-32 slicing-by-8 lookup tables; table 0 is the classic byte table.
const CRC32_TABLES: [[u32; 256]; 8] = crc32_tables();

/// CRC-64 slicing-by-8 lookup tables; table 0 is the classic byte table.
const CRC64_TABLES: [[u64; 256]; 8] = crc64_tables();

/// CRC-32 calculator (ISO 3309).
///
/// - Polynomial: 0x04C11DB7 (reflected: 0xEDB88320)
/// - Initial value: 0xFFFFFFFF
/// - Final XOR: 0xFFFFFFFF
///
/// # Example
///
/// ```
/// use oxixz_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, World!");
/// assert_eq!(crc.finalize(), 0xEC4AC3D0);
/// ```
#[derive(Debug, Clone)]
pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    /// Create a new CRC-32 calculator.
    pub fn new() -> Self {
        Self { crc: 0xFFFFFFFF }
    }

    /// Resume from a previously finalised value.
    pub fn resume(value: u32) -> Self {
        Self { crc: !value }
    }

    /// Reset the CRC to its initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFFFFFF;
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        if data.len() >= SLICE_THRESHOLD {
            crc32_slice8(&mut self.crc, data);
        } else {
            crc32_sw(&mut self.crc, data);
        }
    }

    /// Get the current CRC value (without consuming the calculator).
    #[inline(always)]
    pub fn value(&self) -> u32 {
        !self.crc
    }

    /// Finalize and return the CRC value.
    #[inline(always)]
    pub fn finalize(self) -> u32 {
        !self.crc
    }

    /// Compute CRC-32 for a slice in one call.
    #[inline]
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Continue a finalised CRC-32 value over `data`.
///
/// Start with `0` for a fresh checksum.
#[inline]
pub fn crc32(data: &[u8], running: u32) -> u32 {
    let mut crc = Crc32::resume(running);
    crc.update(data);
    crc.finalize()
}

#[inline]
fn crc32_sw(crc: &mut u32, data: &[u8]) {
    for &byte in data {
        let index = ((*crc ^ byte as u32) & 0xFF) as usize;
        *crc = CRC32_TABLES[0][index] ^ (*crc >> 8);
    }
}

#[inline]
fn crc32_slice8(crc: &mut u32, data: &[u8]) {
    let mut c = *crc;
    let mut chunks = data.chunks_exact(8);

    for bytes in &mut chunks {
        let lo = c ^ u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

        c = CRC32_TABLES[7][(lo & 0xFF) as usize]
            ^ CRC32_TABLES[6][((lo >> 8) & 0xFF) as usize]
            ^ CRC32_TABLES[5][((lo >> 16) & 0xFF) as usize]
            ^ CRC32_TABLES[4][(lo >> 24) as usize]
            ^ CRC32_TABLES[3][bytes[4] as usize]
            ^ CRC32_TABLES[2][bytes[5] as usize]
            ^ CRC32_TABLES[1][bytes[6] as usize]
            ^ CRC32_TABLES[0][bytes[7] as usize];
    }

    *crc = c;
    crc32_sw(crc, chunks.remainder());
}

/// CRC-64/ECMA-182 calculator, as used by the XZ CRC64 check.
///
/// - Polynomial: 0x42F0E1EBA9EA3693 (reflected: 0xC96C5795D7870F42)
/// - Initial value: 0xFFFFFFFFFFFFFFFF
/// - Final XOR: 0xFFFFFFFFFFFFFFFF
///
/// # Example
///
/// ```
/// use oxixz_core::crc::Crc64;
///
/// let mut crc = Crc64::new();
/// crc.update(b"123456789");
/// assert_eq!(crc.finalize(), 0x995DC9BBDF1939FA);
/// ```
#[derive(Debug, Clone)]
pub struct Crc64 {
    crc: u64,
}

impl Crc64 {
    /// Create a new CRC-64 calculator.
    pub fn new() -> Self {
        Self {
            crc: 0xFFFFFFFFFFFFFFFF,
        }
    }

    /// Reset the CRC to its initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFFFFFFFFFFFFFF;
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        if data.len() >= SLICE_THRESHOLD {
            crc64_slice8(&mut self.crc, data);
        } else {
            crc64_sw(&mut self.crc, data);
        }
    }

    /// Get the current CRC value (without consuming the calculator).
    #[inline(always)]
    pub fn value(&self) -> u64 {
        !self.crc
    }

    /// Finalize and return the CRC value.
    #[inline(always)]
    pub fn finalize(self) -> u64 {
        !self.crc
    }

    /// Compute CRC-64 for a slice in one call.
    #[inline]
    pub fn compute(data: &[u8]) -> u64 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc64 {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn crc64_sw(crc: &mut u64, data: &[u8]) {
    for &byte in data {
        let index = ((*crc ^ byte as u64) & 0xFF) as usize;
        *crc = CRC64_TABLES[0][index] ^ (*crc >> 8);
    }
}

#[inline]
fn crc64_slice8(crc: &mut u64, data: &[u8]) {
    let mut c = *crc;
    let mut chunks = data.chunks_exact(8);

    for bytes in &mut chunks {
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        let x = c ^ u64::from_le_bytes(word);

        c = CRC64_TABLES[7][(x & 0xFF) as usize]
            ^ CRC64_TABLES[6][((x >> 8) & 0xFF) as usize]
            ^ CRC64_TABLES[5][((x >> 16) & 0xFF) as usize]
            ^ CRC64_TABLES[4][((x >> 24) & 0xFF) as usize]
            ^ CRC64_TABLES[3][((x >> 32) & 0xFF) as usize]
            ^ CRC64_TABLES[2][((x >> 40) & 0xFF) as usize]
            ^ CRC64_TABLES[1][((x >> 48) & 0xFF) as usize]
            ^ CRC64_TABLES[0][(x >> 56) as usize];
    }

    *crc = c;
    crc64_sw(crc, chunks.remainder());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_empty() {
        assert_eq!(Crc32::compute(b""), 0x00000000);
    }

    #[test]
    fn test_crc32_check() {
        // Standard CRC-32 check value for "123456789"
        assert_eq!(Crc32::compute(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn test_crc32_incremental() {
        let mut crc = Crc32::new();
        crc.update(b"Hello");
        crc.update(b", ");
        crc.update(b"World!");
        assert_eq!(crc.finalize(), 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_running_value() {
        assert_eq!(crc32(b"", 0), 0);
        let first = crc32(b"Hello, ", 0);
        assert_eq!(crc32(b"World!", first), 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_stream_flags() {
        // Stream flags for a CRC32-checked stream as written by xz.
        assert_eq!(crc32(&[0x00, 0x01], 0), 0x36DE2269);
    }

    #[test]
    fn test_crc32_table_correctness() {
        assert_eq!(CRC32_TABLES[0][0], 0x00000000);
        assert_eq!(CRC32_TABLES[0][1], 0x77073096);
        assert_eq!(CRC32_TABLES[0][255], 0x2D02EF8D);
    }

    #[test]
    fn test_crc32_various_sizes() {
        // Boundary conditions around the slicing threshold
        for size in [1, 7, 8, 15, 16, 17, 31, 32, 63, 64, 127, 128, 255, 256] {
            let data: Vec<u8> = (0..size).map(|i| (i * 31 + size) as u8).collect();
            let crc1 = Crc32::compute(&data);

            let mut crc2 = Crc32::new();
            for &byte in &data {
                crc2.update(&[byte]);
            }

            assert_eq!(crc1, crc2.finalize(), "CRC mismatch for size {}", size);
        }
    }

    #[test]
    fn test_crc64_empty() {
        assert_eq!(Crc64::compute(b""), 0x0000000000000000);
    }

    #[test]
    fn test_crc64_check() {
        // Standard CRC-64/ECMA-182 (XZ) check value for "123456789"
        assert_eq!(Crc64::compute(b"123456789"), 0x995DC9BBDF1939FA);
    }

    #[test]
    fn test_crc64_incremental() {
        let mut crc = Crc64::new();
        crc.update(b"12345");
        crc.update(b"6789");
        assert_eq!(crc.finalize(), 0x995DC9BBDF1939FA);
    }

    #[test]
    fn test_crc64_table_correctness() {
        assert_eq!(CRC64_TABLES[0][0], 0x0000000000000000);
        assert_eq!(CRC64_TABLES[0][1], 0xB32E4CBE03A75F6F);
    }

    #[test]
    fn test_crc64_large_data() {
        let data = vec![0x42u8; 1024];
        let crc = Crc64::compute(&data);

        let mut crc2 = Crc64::new();
        for chunk in data.chunks(17) {
            crc2.update(chunk);
        }

        assert_eq!(crc, crc2.finalize());
    }
}
