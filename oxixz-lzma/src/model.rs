//! LZMA probability models.
//!
//! LZMA uses context-dependent probability models for:
//! - Literal decoding (context = previous byte + position)
//! - Match length decoding
//! - Distance decoding
//! - State machine transitions
//!
//! All tables have fixed sizes so a model can be reset in place without
//! reallocating when LZMA2 changes properties mid-stream.

use crate::range_coder::PROB_INIT;

/// Maximum number of position states (`pb <= 4`).
pub const POS_STATES_MAX: usize = 1 << 4;

/// Number of states in the LZMA state machine.
pub const NUM_STATES: usize = 12;

/// Number of bits for low length coding.
pub const LEN_LOW_BITS: u32 = 3;
/// Number of bits for mid length coding.
pub const LEN_MID_BITS: u32 = 3;
/// Number of bits for high length coding.
pub const LEN_HIGH_BITS: u32 = 8;

/// Number of low length symbols.
pub const LEN_LOW_SYMBOLS: usize = 1 << LEN_LOW_BITS;
/// Number of mid length symbols.
pub const LEN_MID_SYMBOLS: usize = 1 << LEN_MID_BITS;
/// Number of high length symbols.
pub const LEN_HIGH_SYMBOLS: usize = 1 << LEN_HIGH_BITS;

/// Minimum match length.
pub const MATCH_LEN_MIN: u32 = 2;

/// Maximum match length.
pub const MATCH_LEN_MAX: u32 =
    MATCH_LEN_MIN + (LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS + LEN_HIGH_SYMBOLS) as u32 - 1;

/// Number of length states used to pick a distance slot tree.
pub const DIST_STATES: usize = 4;

/// Number of bits in a distance slot.
pub const DIST_SLOT_BITS: u32 = 6;

/// Number of distance slots.
pub const DIST_SLOTS: usize = 1 << DIST_SLOT_BITS;

/// First slot whose distance carries extra bits.
pub const DIST_MODEL_START: u32 = 4;

/// First slot whose extra bits are coded directly plus align bits.
pub const DIST_MODEL_END: u32 = 14;

/// Number of distances covered by the special (reverse tree) table.
pub const FULL_DISTANCES: usize = 1 << (DIST_MODEL_END / 2);

/// Number of alignment bits for distance decoding.
pub const DIST_ALIGN_BITS: u32 = 4;
/// Size of alignment table.
pub const DIST_ALIGN_SIZE: usize = 1 << DIST_ALIGN_BITS;

/// Literal coder tables (`lc + lp <= 4`).
pub const LITERAL_CODERS_MAX: usize = 1 << 4;

/// Probabilities per literal coder (plain and matched literals).
pub const LITERAL_CODER_SIZE: usize = 0x300;

/// Largest valid LZMA properties byte, `(4 * 5 + 4) * 9 + 8`.
pub const PROPS_MAX: u8 = 224;

/// LZMA state machine state.
///
/// Names describe the most recent packets, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum State {
    /// Literal after literal after literal.
    #[default]
    LitLit = 0,
    /// Match, then two literals.
    MatchLitLit,
    /// Long rep, then two literals.
    RepLitLit,
    /// Short rep, then two literals.
    ShortRepLitLit,
    /// Match, then a literal.
    MatchLit,
    /// Long rep, then a literal.
    RepLit,
    /// Short rep, then a literal.
    ShortRepLit,
    /// Literal, then a match.
    LitMatch,
    /// Literal, then a long rep.
    LitLongRep,
    /// Literal, then a short rep.
    LitShortRep,
    /// Non-literal, then a match.
    NonLitMatch,
    /// Non-literal, then a rep.
    NonLitRep,
}

impl State {
    /// Index into the per-state probability tables.
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether the previous packet was a literal.
    #[inline(always)]
    pub fn is_literal(self) -> bool {
        (self as u8) < State::LitMatch as u8
    }

    /// Transition after a literal.
    #[inline]
    pub fn update_literal(&mut self) {
        *self = match self {
            State::LitLit | State::MatchLitLit | State::RepLitLit | State::ShortRepLitLit => {
                State::LitLit
            }
            State::MatchLit => State::MatchLitLit,
            State::RepLit => State::RepLitLit,
            State::ShortRepLit => State::ShortRepLitLit,
            State::LitMatch | State::NonLitMatch => State::MatchLit,
            State::LitLongRep | State::NonLitRep => State::RepLit,
            State::LitShortRep => State::ShortRepLit,
        };
    }

    /// Transition after a match.
    #[inline]
    pub fn update_match(&mut self) {
        *self = if self.is_literal() {
            State::LitMatch
        } else {
            State::NonLitMatch
        };
    }

    /// Transition after a long rep.
    #[inline]
    pub fn update_long_rep(&mut self) {
        *self = if self.is_literal() {
            State::LitLongRep
        } else {
            State::NonLitRep
        };
    }

    /// Transition after a short rep.
    #[inline]
    pub fn update_short_rep(&mut self) {
        *self = if self.is_literal() {
            State::LitShortRep
        } else {
            State::NonLitRep
        };
    }
}

/// LZMA properties (lc, lp, pb).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaProperties {
    /// Literal context bits.
    pub lc: u32,
    /// Literal position bits.
    pub lp: u32,
    /// Position bits.
    pub pb: u32,
}

impl LzmaProperties {
    /// Create new properties.
    pub fn new(lc: u32, lp: u32, pb: u32) -> Self {
        Self { lc, lp, pb }
    }

    /// Parse from property byte.
    ///
    /// Returns `None` for bytes above [`PROPS_MAX`].
    pub fn from_byte(byte: u8) -> Option<Self> {
        if byte > PROPS_MAX {
            return None;
        }

        let pb = byte as u32 / 45;
        let remaining = byte as u32 - pb * 45;
        let lp = remaining / 9;
        let lc = remaining - lp * 9;

        Some(Self { lc, lp, pb })
    }

    /// Encode to property byte.
    pub fn to_byte(&self) -> u8 {
        ((self.pb * 45) + (self.lp * 9) + self.lc) as u8
    }

    /// Whether these properties fit LZMA2's `lc + lp <= 4` restriction.
    pub fn is_lzma2_compatible(&self) -> bool {
        self.lc + self.lp <= 4 && self.pb <= 4
    }
}

impl Default for LzmaProperties {
    fn default() -> Self {
        Self { lc: 3, lp: 0, pb: 2 }
    }
}

/// Length decoder model.
#[derive(Debug, Clone)]
pub struct LengthModel {
    /// Choice bit (low vs mid+high).
    pub choice: u16,
    /// Choice2 bit (mid vs high).
    pub choice2: u16,
    /// Low length probabilities (per position state).
    pub low: [[u16; LEN_LOW_SYMBOLS]; POS_STATES_MAX],
    /// Mid length probabilities (per position state).
    pub mid: [[u16; LEN_MID_SYMBOLS]; POS_STATES_MAX],
    /// High length probabilities (shared).
    pub high: [u16; LEN_HIGH_SYMBOLS],
}

impl LengthModel {
    /// Create a new length model.
    pub fn new() -> Self {
        Self {
            choice: PROB_INIT,
            choice2: PROB_INIT,
            low: [[PROB_INIT; LEN_LOW_SYMBOLS]; POS_STATES_MAX],
            mid: [[PROB_INIT; LEN_MID_SYMBOLS]; POS_STATES_MAX],
            high: [PROB_INIT; LEN_HIGH_SYMBOLS],
        }
    }

    /// Reset the model.
    pub fn reset(&mut self) {
        self.choice = PROB_INIT;
        self.choice2 = PROB_INIT;
        for arr in &mut self.low {
            arr.fill(PROB_INIT);
        }
        for arr in &mut self.mid {
            arr.fill(PROB_INIT);
        }
        self.high.fill(PROB_INIT);
    }
}

impl Default for LengthModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Distance model.
#[derive(Debug, Clone)]
pub struct DistanceModel {
    /// Distance slot probabilities (per length state).
    pub slot: [[u16; DIST_SLOTS]; DIST_STATES],
    /// Reverse-tree probabilities for slots 4..14, packed back to back.
    pub special: [u16; FULL_DISTANCES - DIST_MODEL_END as usize],
    /// Alignment probabilities.
    pub align: [u16; DIST_ALIGN_SIZE],
}

impl DistanceModel {
    /// Create a new distance model.
    pub fn new() -> Self {
        Self {
            slot: [[PROB_INIT; DIST_SLOTS]; DIST_STATES],
            special: [PROB_INIT; FULL_DISTANCES - DIST_MODEL_END as usize],
            align: [PROB_INIT; DIST_ALIGN_SIZE],
        }
    }

    /// Reset the model.
    pub fn reset(&mut self) {
        for s in &mut self.slot {
            s.fill(PROB_INIT);
        }
        self.special.fill(PROB_INIT);
        self.align.fill(PROB_INIT);
    }
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete LZMA model containing all probability tables.
#[derive(Debug, Clone)]
pub struct LzmaModel {
    /// Is-match probabilities.
    pub is_match: [[u16; POS_STATES_MAX]; NUM_STATES],
    /// Is-rep probabilities.
    pub is_rep: [u16; NUM_STATES],
    /// Is-rep0 probabilities.
    pub is_rep0: [u16; NUM_STATES],
    /// Is-rep1 probabilities.
    pub is_rep1: [u16; NUM_STATES],
    /// Is-rep2 probabilities.
    pub is_rep2: [u16; NUM_STATES],
    /// Is-rep0-long probabilities.
    pub is_rep0_long: [[u16; POS_STATES_MAX]; NUM_STATES],

    /// Match length model.
    pub match_len: LengthModel,
    /// Rep match length model.
    pub rep_len: LengthModel,

    /// Literal coders, selected by previous byte and position.
    pub literal: [[u16; LITERAL_CODER_SIZE]; LITERAL_CODERS_MAX],

    /// Distance model.
    pub distance: DistanceModel,
}

impl LzmaModel {
    /// Create a model with every probability at its initial value.
    pub fn new() -> Self {
        Self {
            is_match: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            is_rep: [PROB_INIT; NUM_STATES],
            is_rep0: [PROB_INIT; NUM_STATES],
            is_rep1: [PROB_INIT; NUM_STATES],
            is_rep2: [PROB_INIT; NUM_STATES],
            is_rep0_long: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            match_len: LengthModel::new(),
            rep_len: LengthModel::new(),
            literal: [[PROB_INIT; LITERAL_CODER_SIZE]; LITERAL_CODERS_MAX],
            distance: DistanceModel::new(),
        }
    }

    /// Reset all probabilities to initial values.
    pub fn reset(&mut self) {
        for state in &mut self.is_match {
            state.fill(PROB_INIT);
        }
        self.is_rep.fill(PROB_INIT);
        self.is_rep0.fill(PROB_INIT);
        self.is_rep1.fill(PROB_INIT);
        self.is_rep2.fill(PROB_INIT);
        for state in &mut self.is_rep0_long {
            state.fill(PROB_INIT);
        }
        self.match_len.reset();
        self.rep_len.reset();
        for coder in &mut self.literal {
            coder.fill(PROB_INIT);
        }
        self.distance.reset();
    }
}

impl Default for LzmaModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut state = State::default();
        assert!(state.is_literal());

        state.update_match();
        assert_eq!(state, State::LitMatch);
        assert!(!state.is_literal());

        state.update_literal();
        assert_eq!(state, State::MatchLit);
        assert!(state.is_literal());

        state.update_literal();
        assert_eq!(state, State::MatchLitLit);
        state.update_literal();
        assert_eq!(state, State::LitLit);
    }

    #[test]
    fn test_literal_after_nonliteral_states() {
        let cases = [
            (State::LitMatch, State::MatchLit),
            (State::LitLongRep, State::RepLit),
            (State::LitShortRep, State::ShortRepLit),
            (State::NonLitMatch, State::MatchLit),
            (State::NonLitRep, State::RepLit),
        ];
        for (from, to) in cases {
            let mut state = from;
            state.update_literal();
            assert_eq!(state, to, "literal after {:?}", from);
        }
    }

    #[test]
    fn test_rep_transitions() {
        let mut state = State::LitLit;
        state.update_short_rep();
        assert_eq!(state, State::LitShortRep);
        state.update_long_rep();
        assert_eq!(state, State::NonLitRep);
        state.update_match();
        assert_eq!(state, State::NonLitMatch);
        state.update_short_rep();
        assert_eq!(state, State::NonLitRep);
    }

    #[test]
    fn test_properties_encoding() {
        let props = LzmaProperties::new(3, 0, 2);
        let byte = props.to_byte();
        assert_eq!(byte, 0x5D);
        let decoded = LzmaProperties::from_byte(byte).expect("valid props");
        assert_eq!(decoded, props);
    }

    #[test]
    fn test_properties_limits() {
        assert!(LzmaProperties::from_byte(PROPS_MAX).is_some());
        assert!(LzmaProperties::from_byte(PROPS_MAX + 1).is_none());

        let wide = LzmaProperties::from_byte(LzmaProperties::new(4, 1, 0).to_byte())
            .expect("byte is in range");
        assert!(!wide.is_lzma2_compatible());
        assert!(LzmaProperties::new(1, 3, 4).is_lzma2_compatible());
    }

    #[test]
    fn test_max_match_len() {
        assert_eq!(MATCH_LEN_MAX, 273);
    }

    #[test]
    fn test_model_reset() {
        let mut model = LzmaModel::new();
        model.is_match[3][2] = 7;
        model.literal[15][0x2FF] = 9;
        model.distance.align[1] = 11;
        model.reset();
        assert_eq!(model.is_match[3][2], PROB_INIT);
        assert_eq!(model.literal[15][0x2FF], PROB_INIT);
        assert_eq!(model.distance.align[1], PROB_INIT);
    }
}
