//! LZMA symbol decoder.
//!
//! Decodes literals, matches, and repeated matches into a [`Dictionary`]
//! until the dictionary's write limit is reached or the range decoder passes
//! its input limit. A match that does not fit before the limit leaves its
//! remainder in a pending length, finished first on the next run.

use crate::dict::{DictStorage, Dictionary};
use crate::model::{
    DIST_ALIGN_BITS, DIST_MODEL_END, DIST_MODEL_START, DIST_SLOT_BITS, DIST_STATES, LEN_HIGH_BITS,
    LEN_LOW_BITS, LEN_LOW_SYMBOLS, LEN_MID_BITS, LEN_MID_SYMBOLS, LengthModel, LzmaModel,
    LzmaProperties, MATCH_LEN_MIN, State,
};
use crate::range_coder::{RangeDecoder, RcInput};
use oxixz_core::{Result, XzError};

/// LZMA decoder state carried across calls and chunks.
#[derive(Debug)]
pub struct LzmaDecoder {
    /// Range decoder.
    pub(crate) rc: RangeDecoder,
    model: Box<LzmaModel>,
    state: State,
    /// Last four match distances, most recent first (zero-based).
    rep: [u32; 4],
    /// Bytes of the current match still to be copied.
    pending_len: u32,
    lc: u32,
    literal_pos_mask: usize,
    pos_mask: usize,
}

impl LzmaDecoder {
    /// Create a decoder with default properties and fresh probabilities.
    pub fn new() -> Self {
        let mut decoder = Self {
            rc: RangeDecoder::new(),
            model: Box::new(LzmaModel::new()),
            state: State::default(),
            rep: [0; 4],
            pending_len: 0,
            lc: 0,
            literal_pos_mask: 0,
            pos_mask: 0,
        };
        decoder.apply_properties(LzmaProperties::default());
        decoder
    }

    /// Parse and apply a properties byte, then reset the coder state.
    ///
    /// Fails with an options error for bytes above 224 or `lc + lp > 4`.
    pub fn set_properties(&mut self, byte: u8) -> Result<()> {
        let props = LzmaProperties::from_byte(byte)
            .ok_or_else(|| XzError::unsupported(format!("LZMA properties byte {byte:#04x}")))?;
        if !props.is_lzma2_compatible() {
            return Err(XzError::unsupported(format!(
                "lc + lp = {} exceeds 4",
                props.lc + props.lp
            )));
        }
        self.apply_properties(props);
        self.reset_state();
        Ok(())
    }

    fn apply_properties(&mut self, props: LzmaProperties) {
        self.lc = props.lc;
        self.literal_pos_mask = (1 << props.lp) - 1;
        self.pos_mask = (1 << props.pb) - 1;
    }

    /// Reset probabilities, state, rep distances, and the range decoder.
    pub fn reset_state(&mut self) {
        self.state = State::default();
        self.rep = [0; 4];
        self.pending_len = 0;
        self.model.reset();
        self.rc.reset();
    }

    /// Length of a match interrupted by the output limit.
    pub fn pending_len(&self) -> u32 {
        self.pending_len
    }

    /// Decode symbols into `dict` from `input`.
    ///
    /// `out` is the caller's whole output slice, used as the window by
    /// direct dictionaries.
    pub fn run<S: DictStorage>(
        &mut self,
        input: &mut RcInput<'_>,
        dict: &mut Dictionary<S>,
        out: &mut [u8],
    ) -> Result<()> {
        if dict.has_room() && self.pending_len > 0 {
            // The distance was validated when the match was decoded.
            dict.repeat(out, &mut self.pending_len, self.rep[0] as usize);
        }

        while dict.has_room() && !input.limit_exceeded() {
            let pos_state = dict.pos() & self.pos_mask;
            let state = self.state.index();

            if !self
                .rc
                .decode_bit(input, &mut self.model.is_match[state][pos_state])
            {
                self.decode_literal(input, dict, out);
            } else {
                if self
                    .rc
                    .decode_bit(input, &mut self.model.is_rep[state])
                {
                    self.decode_rep_match(input, pos_state);
                } else {
                    self.decode_match(input, pos_state);
                }

                let distance = self.rep[0] as usize;
                if !dict.repeat(out, &mut self.pending_len, distance) {
                    return Err(XzError::invalid_distance(distance, dict.full()));
                }
            }
        }

        self.rc.normalize(input);
        Ok(())
    }

    fn decode_literal<S: DictStorage>(
        &mut self,
        input: &mut RcInput<'_>,
        dict: &mut Dictionary<S>,
        out: &mut [u8],
    ) {
        let prev_byte = dict.get(out, 0) as usize;
        let low = prev_byte >> (8 - self.lc);
        let high = (dict.pos() & self.literal_pos_mask) << self.lc;
        let probs = &mut self.model.literal[low + high];

        let mut symbol = 1usize;
        if self.state.is_literal() {
            while symbol < 0x100 {
                let bit = self.rc.decode_bit(input, &mut probs[symbol]);
                symbol = (symbol << 1) | bit as usize;
            }
        } else {
            // Matched literal: use the byte at rep0 as extra context until the
            // decoded bits diverge from it.
            let mut match_byte = (dict.get(out, self.rep[0] as usize) as usize) << 1;
            let mut offset = 0x100usize;
            while symbol < 0x100 {
                let match_bit = match_byte & offset;
                match_byte <<= 1;
                let i = offset + match_bit + symbol;
                if self.rc.decode_bit(input, &mut probs[i]) {
                    symbol = (symbol << 1) | 1;
                    offset &= match_bit;
                } else {
                    symbol <<= 1;
                    offset &= !match_bit;
                }
            }
        }

        dict.put(out, symbol as u8);
        self.state.update_literal();
    }

    fn decode_len(
        rc: &mut RangeDecoder,
        input: &mut RcInput<'_>,
        model: &mut LengthModel,
        pos_state: usize,
    ) -> u32 {
        if !rc.decode_bit(input, &mut model.choice) {
            MATCH_LEN_MIN + rc.decode_tree(input, &mut model.low[pos_state], LEN_LOW_BITS)
        } else if !rc.decode_bit(input, &mut model.choice2) {
            MATCH_LEN_MIN
                + LEN_LOW_SYMBOLS as u32
                + rc.decode_tree(input, &mut model.mid[pos_state], LEN_MID_BITS)
        } else {
            MATCH_LEN_MIN
                + (LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS) as u32
                + rc.decode_tree(input, &mut model.high, LEN_HIGH_BITS)
        }
    }

    fn decode_match(&mut self, input: &mut RcInput<'_>, pos_state: usize) {
        self.state.update_match();
        self.rep[3] = self.rep[2];
        self.rep[2] = self.rep[1];
        self.rep[1] = self.rep[0];

        self.pending_len = Self::decode_len(&mut self.rc, input, &mut self.model.match_len, pos_state);

        let len_state = ((self.pending_len - MATCH_LEN_MIN) as usize).min(DIST_STATES - 1);
        let dist = &mut self.model.distance;
        let slot = self
            .rc
            .decode_tree(input, &mut dist.slot[len_state], DIST_SLOT_BITS);

        self.rep[0] = if slot < DIST_MODEL_START {
            slot
        } else {
            let limit = (slot >> 1) - 1;
            let base = (2 | (slot & 1)) << limit;
            if slot < DIST_MODEL_END {
                let offset = (base - slot) as usize;
                base + self
                    .rc
                    .decode_tree_reverse(input, &mut dist.special[offset..], limit)
            } else {
                let direct = self.rc.decode_direct_bits(input, limit - DIST_ALIGN_BITS);
                base + (direct << DIST_ALIGN_BITS)
                    + self
                        .rc
                        .decode_tree_reverse(input, &mut dist.align, DIST_ALIGN_BITS)
            }
        };
    }

    fn decode_rep_match(&mut self, input: &mut RcInput<'_>, pos_state: usize) {
        let state = self.state.index();

        if !self.rc.decode_bit(input, &mut self.model.is_rep0[state]) {
            if !self
                .rc
                .decode_bit(input, &mut self.model.is_rep0_long[state][pos_state])
            {
                self.state.update_short_rep();
                self.pending_len = 1;
                return;
            }
        } else {
            let distance = if !self.rc.decode_bit(input, &mut self.model.is_rep1[state]) {
                self.rep[1]
            } else {
                let distance = if !self.rc.decode_bit(input, &mut self.model.is_rep2[state]) {
                    self.rep[2]
                } else {
                    let distance = self.rep[3];
                    self.rep[3] = self.rep[2];
                    distance
                };
                self.rep[2] = self.rep[1];
                distance
            };
            self.rep[1] = self.rep[0];
            self.rep[0] = distance;
        }

        self.state.update_long_rep();
        self.pending_len = Self::decode_len(&mut self.rc, input, &mut self.model.rep_len, pos_state);
    }
}

impl Default for LzmaDecoder {
    fn default() -> Self {
        Self::new()
    }
}
