//! LZMA2 chunk decoder.
//!
//! LZMA2 wraps LZMA in a chunked framing that allows:
//! - Uncompressed chunks (stored as-is)
//! - Dictionary and state resets between chunks
//! - Property changes mid-stream
//!
//! ## Chunk Format
//!
//! Each chunk starts with a control byte:
//! - 0x00: End of LZMA2 stream
//! - 0x01: Uncompressed chunk, dictionary reset
//! - 0x02: Uncompressed chunk, no reset
//! - 0x80-0xFF: LZMA chunk. Bits 5-6 pick the reset level:
//!   0x80 nothing, 0xA0 state, 0xC0 state and new properties,
//!   0xE0 everything including the dictionary.
//!
//! LZMA chunks carry `uncompressed - 1` in 21 bits and `compressed - 1` in 16
//! bits, both big-endian after the control byte.

use crate::decoder::LzmaDecoder;
use crate::dict::{DictMode, DictStorage, Dictionary, Growable};
use crate::range_coder::{RC_INIT_BYTES, RcInput};
use oxixz_core::{DecompressStatus, Decompressor, InOutBuffer, Result, XzError};

/// Largest number of input bytes one LZMA event can consume.
///
/// Input is handed to the LZMA decoder with this much slack past its limit,
/// so a symbol started before the limit always completes.
pub const LZMA_IN_REQUIRED: usize = 21;

/// Largest valid dictionary-size properties byte.
pub const DICT_PROPS_MAX: u8 = 39;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sequence {
    Control,
    Uncompressed1,
    Uncompressed2,
    Compressed0,
    Compressed1,
    Properties,
    LzmaPrepare,
    LzmaRun,
    Copy,
}

/// Streaming LZMA2 decoder.
///
/// The storage parameter picks the dictionary strategy; see
/// [`crate::dict`]. With [`crate::Direct`] storage the whole output must be
/// passed to a single [`decode`](Self::decode) call.
#[derive(Debug)]
pub struct Lzma2Decoder<S: DictStorage> {
    sequence: Sequence,
    /// Sequence to enter after the compressed size has been read.
    next_sequence: Sequence,
    /// Uncompressed bytes left in the current chunk.
    uncompressed: usize,
    /// Compressed bytes left in the current chunk.
    compressed: usize,
    /// No chunk may appear before one that resets the dictionary.
    need_dict_reset: bool,
    /// The next LZMA chunk must carry a properties byte.
    need_props: bool,
    lzma: LzmaDecoder,
    dict: Dictionary<S>,
    /// Chunk data split across input buffers, plus zeroed slack.
    temp: [u8; 3 * LZMA_IN_REQUIRED],
    temp_size: usize,
    finished: bool,
}

impl<S: DictStorage> Lzma2Decoder<S> {
    /// Create a decoder over the given dictionary storage.
    ///
    /// Call [`reset`](Self::reset) with the stream's dictionary properties
    /// before decoding.
    pub fn new(storage: S) -> Self {
        Self {
            sequence: Sequence::Control,
            next_sequence: Sequence::Control,
            uncompressed: 0,
            compressed: 0,
            need_dict_reset: true,
            need_props: true,
            lzma: LzmaDecoder::new(),
            dict: Dictionary::new(storage),
            temp: [0; 3 * LZMA_IN_REQUIRED],
            temp_size: 0,
            finished: false,
        }
    }

    /// Prepare for a new LZMA2 stream with the given dictionary-size byte.
    ///
    /// Fails with an options error for bytes above 39 or dictionaries larger
    /// than the storage allows, and with a memory error when growing the
    /// ring fails.
    pub fn reset(&mut self, dict_props: u8) -> Result<()> {
        let size = dict_size_from_props(dict_props).ok_or_else(|| {
            XzError::unsupported(format!("LZMA2 dictionary size byte {dict_props}"))
        })?;
        self.dict.configure(size as usize)?;
        tracing::debug!(dict_size = size, mode = ?S::MODE, "lzma2 reset");
        self.restart();
        Ok(())
    }

    fn restart(&mut self) {
        self.sequence = Sequence::Control;
        self.next_sequence = Sequence::Control;
        self.uncompressed = 0;
        self.compressed = 0;
        self.need_dict_reset = true;
        self.need_props = true;
        self.temp_size = 0;
        self.finished = false;
        self.lzma.reset_state();
    }

    /// Declared dictionary size of the current stream.
    pub fn dict_size(&self) -> usize {
        self.dict.size()
    }

    /// Dictionary storage strategy.
    pub fn mode(&self) -> DictMode {
        self.dict.mode()
    }

    /// Bytes held by the dictionary storage.
    pub fn allocated(&self) -> usize {
        self.dict.allocated()
    }

    /// Whether the end marker has been decoded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode as much as the buffers allow.
    ///
    /// Returns `Ok(true)` once the end-of-stream control byte has been
    /// consumed; input after it is left untouched.
    pub fn decode(&mut self, buf: &mut InOutBuffer<'_>) -> Result<bool> {
        if self.finished {
            return Ok(true);
        }

        while buf.in_remaining() > 0 || self.sequence == Sequence::LzmaRun {
            match self.sequence {
                Sequence::Control => {
                    let Some(control) = buf.read_byte() else {
                        break;
                    };
                    if control == 0x00 {
                        tracing::trace!("lzma2 end marker");
                        self.finished = true;
                        return Ok(true);
                    }
                    self.control(control, buf)?;
                }
                Sequence::Uncompressed1 => {
                    let Some(byte) = buf.read_byte() else { break };
                    self.uncompressed += (byte as usize) << 8;
                    self.sequence = Sequence::Uncompressed2;
                }
                Sequence::Uncompressed2 => {
                    let Some(byte) = buf.read_byte() else { break };
                    self.uncompressed += byte as usize + 1;
                    self.sequence = Sequence::Compressed0;
                }
                Sequence::Compressed0 => {
                    let Some(byte) = buf.read_byte() else { break };
                    self.compressed = (byte as usize) << 8;
                    self.sequence = Sequence::Compressed1;
                }
                Sequence::Compressed1 => {
                    let Some(byte) = buf.read_byte() else { break };
                    self.compressed += byte as usize + 1;
                    self.sequence = self.next_sequence;
                    tracing::trace!(
                        compressed = self.compressed,
                        uncompressed = self.uncompressed,
                        raw = self.next_sequence == Sequence::Copy,
                        "lzma2 chunk"
                    );
                }
                Sequence::Properties => {
                    let Some(byte) = buf.read_byte() else { break };
                    self.lzma.set_properties(byte)?;
                    self.sequence = Sequence::LzmaPrepare;
                }
                Sequence::LzmaPrepare => {
                    if self.compressed < RC_INIT_BYTES as usize {
                        return Err(XzError::corrupted(
                            "LZMA chunk too short for range coder init",
                        ));
                    }
                    if !self.lzma.rc.read_init(buf)? {
                        return Ok(false);
                    }
                    self.compressed -= RC_INIT_BYTES as usize;
                    self.sequence = Sequence::LzmaRun;
                }
                Sequence::LzmaRun => {
                    // The chunk's uncompressed size and the caller's free space
                    // both bound this run; the tighter one wins.
                    self.dict
                        .set_limit(buf.out_remaining().min(self.uncompressed));
                    self.decode_lzma(buf)?;
                    self.uncompressed -= self.dict.flush(buf);

                    if self.uncompressed == 0 {
                        if self.compressed > 0 {
                            return Err(XzError::size_mismatch(
                                "LZMA chunk compressed",
                                0,
                                self.compressed as u64,
                            ));
                        }
                        if self.lzma.pending_len() > 0 || !self.lzma.rc.is_finished() {
                            return Err(XzError::corrupted(
                                "LZMA chunk did not end cleanly",
                            ));
                        }
                        self.lzma.rc.reset();
                        self.sequence = Sequence::Control;
                    } else if buf.output_full()
                        || (buf.input_exhausted() && self.temp_size < self.compressed)
                    {
                        return Ok(false);
                    }
                }
                Sequence::Copy => {
                    self.dict.copy_uncompressed(buf, &mut self.compressed);
                    if self.compressed > 0 {
                        return Ok(false);
                    }
                    self.sequence = Sequence::Control;
                }
            }
        }

        Ok(false)
    }

    fn control(&mut self, control: u8, buf: &InOutBuffer<'_>) -> Result<()> {
        if control >= 0xE0 || control == 0x01 {
            self.need_props = true;
            self.need_dict_reset = false;
            self.dict.reset(buf);
        } else if self.need_dict_reset {
            return Err(XzError::corrupted(format!(
                "LZMA2 chunk {control:#04x} before dictionary reset"
            )));
        }

        if control >= 0x80 {
            self.uncompressed = ((control & 0x1F) as usize) << 16;
            self.sequence = Sequence::Uncompressed1;

            if control >= 0xC0 {
                self.need_props = false;
                self.next_sequence = Sequence::Properties;
            } else if self.need_props {
                return Err(XzError::corrupted(format!(
                    "LZMA2 chunk {control:#04x} without properties"
                )));
            } else {
                self.next_sequence = Sequence::LzmaPrepare;
                if control >= 0xA0 {
                    self.lzma.reset_state();
                }
            }
        } else {
            if control > 0x02 {
                return Err(XzError::corrupted(format!(
                    "invalid LZMA2 control byte {control:#04x}"
                )));
            }
            self.sequence = Sequence::Compressed0;
            self.next_sequence = Sequence::Copy;
        }
        Ok(())
    }

    /// Feed the current chunk's compressed bytes to the LZMA decoder.
    ///
    /// Runs directly on the caller's input while at least
    /// [`LZMA_IN_REQUIRED`] bytes are available; the tail is staged in
    /// `temp` until enough arrives or the chunk ends.
    fn decode_lzma(&mut self, buf: &mut InOutBuffer<'_>) -> Result<()> {
        let in_avail = buf.in_remaining();

        if self.temp_size > 0 || self.compressed == 0 {
            let mut tmp = 2 * LZMA_IN_REQUIRED - self.temp_size;
            tmp = tmp.min(self.compressed - self.temp_size).min(in_avail);

            let in_pos = buf.in_pos();
            let staged = self.temp_size + tmp;
            self.temp[self.temp_size..staged].copy_from_slice(&buf.input()[in_pos..in_pos + tmp]);

            let limit = if staged == self.compressed {
                self.temp[staged..].fill(0);
                staged
            } else if staged < LZMA_IN_REQUIRED {
                self.temp_size = staged;
                buf.advance_input(tmp);
                return Ok(());
            } else {
                staged - LZMA_IN_REQUIRED
            };

            let mut input = RcInput::new(&self.temp, 0, limit);
            self.lzma.run(&mut input, &mut self.dict, buf.output_mut())?;
            let used = input.pos();

            if used > staged {
                return Err(XzError::corrupted("LZMA chunk overran its compressed size"));
            }
            self.compressed -= used;

            if used < self.temp_size {
                self.temp.copy_within(used..self.temp_size, 0);
                self.temp_size -= used;
                return Ok(());
            }

            buf.advance_input(used - self.temp_size);
            self.temp_size = 0;
        }

        let in_avail = buf.in_remaining();
        if in_avail >= LZMA_IN_REQUIRED {
            let start = buf.in_pos();
            let limit = if in_avail >= self.compressed + LZMA_IN_REQUIRED {
                start + self.compressed
            } else {
                buf.in_len() - LZMA_IN_REQUIRED
            };

            let mut input = RcInput::new(buf.input(), start, limit);
            self.lzma.run(&mut input, &mut self.dict, buf.output_mut())?;
            let used = input.pos() - start;

            if used > self.compressed {
                return Err(XzError::corrupted("LZMA chunk overran its compressed size"));
            }
            self.compressed -= used;
            buf.set_in_pos(start + used);
        }

        let in_avail = buf.in_remaining();
        if in_avail < LZMA_IN_REQUIRED {
            let n = in_avail.min(self.compressed);
            let in_pos = buf.in_pos();
            self.temp[..n].copy_from_slice(&buf.input()[in_pos..in_pos + n]);
            self.temp_size = n;
            buf.advance_input(n);
        }

        Ok(())
    }
}

impl<S: DictStorage> Decompressor for Lzma2Decoder<S> {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        let mut buf = InOutBuffer::new(input, output);
        let done = self.decode(&mut buf)?;

        let status = if done {
            DecompressStatus::Done
        } else if buf.output_full() {
            DecompressStatus::NeedsOutput
        } else {
            DecompressStatus::NeedsInput
        };

        Ok((buf.in_pos(), buf.out_pos(), status))
    }

    fn reset(&mut self) {
        self.restart();
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Dictionary size encoded by an LZMA2 properties byte.
///
/// Formula: `(2 | (props & 1)) << (props / 2 + 11)`. Returns `None` for
/// bytes above 39.
pub fn dict_size_from_props(props: u8) -> Option<u32> {
    if props > DICT_PROPS_MAX {
        return None;
    }
    let base = 2 | (props as u32 & 1);
    Some(base << (props / 2 + 11))
}

/// Decode a raw LZMA2 stream in one call.
///
/// `dict_props` is the dictionary-size byte that an XZ block header would
/// carry for this stream.
pub fn decode_lzma2(data: &[u8], dict_props: u8) -> Result<Vec<u8>> {
    let size = dict_size_from_props(dict_props).ok_or_else(|| {
        XzError::unsupported(format!("LZMA2 dictionary size byte {dict_props}"))
    })?;
    let mut decoder = Lzma2Decoder::new(Growable::new(size as usize));
    decoder.reset(dict_props)?;
    decoder.decompress_all(data)
}
