//! Range decoder for LZMA decompression.
//!
//! The range coder is an entropy coding method similar to arithmetic coding.
//! LZMA uses a specific variant with:
//! - 32-bit range tracking
//! - Normalization when range drops below 2^24
//! - 11-bit probability model (2048 = 100%)
//!
//! The decoder never blocks on input inside a single symbol. LZMA2 hands it an
//! [`RcInput`] window whose `limit` leaves enough slack after the last event
//! that one full literal or match can always be decoded without running off
//! the buffer.

use oxixz_core::{InOutBuffer, Result, XzError};

/// Number of bits in probability model.
pub const PROB_BITS: u32 = 11;

/// Initial probability (50%).
pub const PROB_INIT: u16 = 1 << (PROB_BITS - 1);

/// Maximum probability value.
pub const PROB_MAX: u16 = 1 << PROB_BITS;

/// Number of bits to shift for probability update.
pub const MOVE_BITS: u32 = 5;

/// Number of bytes consumed by range decoder initialisation.
pub const RC_INIT_BYTES: u32 = 5;

/// Top value for range normalization.
const TOP_VALUE: u32 = 1 << 24;

/// Bounded input window for one LZMA run.
///
/// `limit` is the position after which no new event may start; bytes past
/// `limit` but inside `buf` are slack for the event in progress.
#[derive(Debug)]
pub struct RcInput<'a> {
    buf: &'a [u8],
    pos: usize,
    limit: usize,
}

impl<'a> RcInput<'a> {
    /// Create a window over `buf`, starting at `pos`.
    pub fn new(buf: &'a [u8], pos: usize, limit: usize) -> Self {
        Self { buf, pos, limit }
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Whether the position has moved past the limit.
    #[inline]
    pub fn limit_exceeded(&self) -> bool {
        self.pos > self.limit
    }

    #[inline(always)]
    fn next_byte(&mut self) -> u8 {
        // Reads past the end only happen on corrupt input; they yield zero and
        // the caller rejects the overrun afterwards.
        let byte = self.buf.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        byte
    }
}

/// Range decoder for LZMA decompression.
#[derive(Debug, Clone)]
pub struct RangeDecoder {
    range: u32,
    code: u32,
    init_bytes_left: u32,
}

impl RangeDecoder {
    /// Create a range decoder awaiting its initialisation bytes.
    pub fn new() -> Self {
        Self {
            range: 0xFFFF_FFFF,
            code: 0,
            init_bytes_left: RC_INIT_BYTES,
        }
    }

    /// Return to the uninitialised state.
    pub fn reset(&mut self) {
        self.range = 0xFFFF_FFFF;
        self.code = 0;
        self.init_bytes_left = RC_INIT_BYTES;
    }

    /// Consume initialisation bytes from `buf`.
    ///
    /// Returns `Ok(false)` when input ran out before all five bytes were seen;
    /// the next call continues where this one stopped.
    pub fn read_init(&mut self, buf: &mut InOutBuffer<'_>) -> Result<bool> {
        while self.init_bytes_left > 0 {
            let Some(byte) = buf.read_byte() else {
                return Ok(false);
            };
            if self.init_bytes_left == RC_INIT_BYTES && byte != 0x00 {
                return Err(XzError::corrupted("range coder first byte is not zero"));
            }
            self.code = (self.code << 8) | byte as u32;
            self.init_bytes_left -= 1;
        }
        Ok(true)
    }

    /// Whether all initialisation bytes have been consumed.
    pub fn is_initialized(&self) -> bool {
        self.init_bytes_left == 0
    }

    /// Normalize the range (refill when range gets small).
    #[inline(always)]
    pub fn normalize(&mut self, input: &mut RcInput<'_>) {
        if self.range < TOP_VALUE {
            self.range <<= 8;
            self.code = (self.code << 8) | input.next_byte() as u32;
        }
    }

    /// Decode a single bit with the given adaptive probability.
    #[inline(always)]
    pub fn decode_bit(&mut self, input: &mut RcInput<'_>, prob: &mut u16) -> bool {
        self.normalize(input);

        let bound = (self.range >> PROB_BITS) * (*prob as u32);

        if self.code < bound {
            self.range = bound;
            *prob += (PROB_MAX - *prob) >> MOVE_BITS;
            false
        } else {
            self.range -= bound;
            self.code -= bound;
            *prob -= *prob >> MOVE_BITS;
            true
        }
    }

    /// Decode a `bits`-wide bit tree, most significant bit first.
    ///
    /// `probs` is indexed by tree node, starting at 1.
    #[inline]
    pub fn decode_tree(&mut self, input: &mut RcInput<'_>, probs: &mut [u16], bits: u32) -> u32 {
        let limit = 1usize << bits;
        let mut symbol = 1usize;

        while symbol < limit {
            let bit = self.decode_bit(input, &mut probs[symbol]);
            symbol = (symbol << 1) | bit as usize;
        }

        (symbol - limit) as u32
    }

    /// Decode a `bits`-wide bit tree, least significant bit first.
    ///
    /// Tree node `n` (starting at 1) lives at `probs[n - 1]`.
    #[inline]
    pub fn decode_tree_reverse(
        &mut self,
        input: &mut RcInput<'_>,
        probs: &mut [u16],
        bits: u32,
    ) -> u32 {
        let mut symbol = 1usize;
        let mut result = 0u32;

        for i in 0..bits {
            let bit = self.decode_bit(input, &mut probs[symbol - 1]);
            symbol = (symbol << 1) | bit as usize;
            result |= (bit as u32) << i;
        }

        result
    }

    /// Decode `count` bits with fixed 50% probability, most significant first.
    #[inline]
    pub fn decode_direct_bits(&mut self, input: &mut RcInput<'_>, count: u32) -> u32 {
        let mut result = 0u32;

        for _ in 0..count {
            self.normalize(input);
            self.range >>= 1;
            self.code = self.code.wrapping_sub(self.range);
            // All ones when the subtraction wrapped (bit is 0), else zero.
            let mask = 0u32.wrapping_sub(self.code >> 31);
            self.code = self.code.wrapping_add(self.range & mask);
            result = (result << 1).wrapping_add(mask.wrapping_add(1));
        }

        result
    }

    /// Whether the encoder's final flush has been fully consumed.
    pub fn is_finished(&self) -> bool {
        self.code == 0
    }
}

impl Default for RangeDecoder {
    fn default() -> Self {
        Self::new()
    }
}
