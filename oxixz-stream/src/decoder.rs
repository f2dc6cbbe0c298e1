//! XZ stream decoder.
//!
//! Walks one stream through its phases:
//!
//! ```text
//! StreamHeader -> BlockStart -> (BlockHeader -> BlockData -> BlockPadding
//!   -> BlockCheck -> BlockStart)* -> Index -> IndexPadding -> IndexCrc32
//!   -> StreamFooter -> Done
//! ```
//!
//! Fixed-size structures (stream header and footer, block headers, check
//! fields, the index CRC32) are collected in a 1024-byte scratch buffer so
//! they may arrive split across any number of calls. Block sizes are summed
//! into a hash as blocks end; the index records are summed into a second
//! hash the same way, and the two must agree.

use crate::check::BlockCheck;
use crate::config::{CheckPolicy, DecoderConfig};
use crate::filter::{FilterSet, PostFilter};
use crate::header::{
    CheckKind, STREAM_HEADER_SIZE, le_u32, parse_stream_footer, parse_stream_header,
};
use crate::stats::{BlockRecord, StreamStats};
use crate::vli::VliDecoder;
use oxixz_core::crc::crc32;
use oxixz_core::{
    DecompressStatus, Decompressor, ErrorKind, InOutBuffer, Result, XzError,
};
use oxixz_lzma::{DictMode, DictStorage, Direct, Growable, Lzma2Decoder, Preallocated};

/// LZMA2 filter id.
pub const FILTER_LZMA2: u8 = 0x21;

/// Largest block header, and the scratch buffer size.
const TEMP_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sequence {
    StreamHeader,
    BlockStart,
    BlockHeader,
    BlockData,
    BlockPadding,
    BlockCheck,
    Index,
    IndexPadding,
    IndexCrc32,
    StreamFooter,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexSequence {
    Count,
    Unpadded,
    Uncompressed,
}

/// Running sums over block sizes, with a CRC32 over the sums after each
/// block so that order and count matter too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SizeHash {
    unpadded: u64,
    uncompressed: u64,
    crc32: u32,
}

impl SizeHash {
    fn record(&mut self, unpadded: u64, uncompressed: u64) {
        self.unpadded = self.unpadded.wrapping_add(unpadded);
        self.uncompressed = self.uncompressed.wrapping_add(uncompressed);

        let mut sums = [0u8; 16];
        sums[..8].copy_from_slice(&self.unpadded.to_le_bytes());
        sums[8..].copy_from_slice(&self.uncompressed.to_le_bytes());
        self.crc32 = crc32(&sums, self.crc32);
    }
}

/// What the current block header declared.
#[derive(Debug, Clone, Copy, Default)]
struct BlockHeader {
    /// Header size including the size byte and CRC32.
    size: usize,
    compressed: Option<u64>,
    uncompressed: Option<u64>,
    filter: Option<u8>,
    dict_size: u32,
}

/// Totals of the current block and the blocks so far.
#[derive(Debug, Clone, Copy, Default)]
struct Blocks {
    compressed: u64,
    uncompressed: u64,
    count: u64,
    hash: SizeHash,
}

#[derive(Debug, Clone, Copy)]
struct Index {
    sequence: IndexSequence,
    /// Bytes of the index seen so far, excluding its CRC32.
    size: u64,
    /// Records still to read.
    count: u64,
    pending_unpadded: u64,
    hash: SizeHash,
    crc32: u32,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            sequence: IndexSequence::Count,
            size: 0,
            count: 0,
            pending_unpadded: 0,
            hash: SizeHash::default(),
            crc32: 0,
        }
    }
}

/// Scratch space for fixed-size structures.
#[derive(Debug)]
struct Temp {
    buf: [u8; TEMP_SIZE],
    pos: usize,
    size: usize,
}

impl Temp {
    fn begin(&mut self, size: usize) {
        self.pos = 0;
        self.size = size;
    }

    /// Copy input until `size` bytes are collected.
    fn fill(&mut self, buf: &mut InOutBuffer<'_>) -> bool {
        let n = buf.in_remaining().min(self.size - self.pos);
        let in_pos = buf.in_pos();
        self.buf[self.pos..self.pos + n].copy_from_slice(&buf.input()[in_pos..in_pos + n]);
        buf.advance_input(n);
        self.pos += n;

        if self.pos == self.size {
            self.pos = 0;
            true
        } else {
            false
        }
    }

    fn bytes(&self) -> &[u8] {
        &self.buf[..self.size]
    }
}

/// Streaming decoder for one XZ stream.
///
/// The storage parameter picks the dictionary strategy:
///
/// - [`Growable`] ([`XzDecoder::new`]): the ring grows to each block's
///   declared size, up to [`DecoderConfig::dict_max`].
/// - [`Preallocated`] ([`XzDecoder::preallocated`]): `dict_max` bytes are
///   allocated once.
/// - [`Direct`] ([`XzDecoder::single_shot`]): no dictionary memory; the
///   whole stream must be decoded by one [`decode`](Self::decode) call with
///   an output buffer large enough for all of it.
///
/// Any error is terminal: later calls fail with [`XzError::Failed`] until
/// [`reset`](Self::reset).
///
/// # Example
///
/// ```no_run
/// use oxixz_core::{DecompressStatus, InOutBuffer};
/// use oxixz_stream::XzDecoder;
///
/// let data = std::fs::read("file.xz")?;
/// let mut decoder = XzDecoder::new();
/// let mut out = vec![0u8; 1 << 16];
/// let mut pos = 0;
/// loop {
///     let mut buf = InOutBuffer::new(&data[pos..], &mut out);
///     let status = decoder.decode(&mut buf)?;
///     pos += buf.in_pos();
///     // write buf.output() somewhere
///     if status == DecompressStatus::Done {
///         break;
///     }
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct XzDecoder<S: DictStorage = Growable> {
    config: DecoderConfig,
    sequence: Sequence,
    /// Input position where unhashed index bytes start.
    in_start: usize,
    vli: VliDecoder,
    check: BlockCheck,
    block_header: BlockHeader,
    blocks: Blocks,
    index: Index,
    temp: Temp,
    lzma2: Lzma2Decoder<S>,
    filters: FilterSet,
    /// The previous call made no progress.
    allow_stall: bool,
    failed: Option<ErrorKind>,
    stats: StreamStats,
}

impl XzDecoder<Growable> {
    /// Create a multi-call decoder with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a multi-call decoder with a growable dictionary.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self::from_parts(Growable::new(config.dict_max), config)
    }
}

impl Default for XzDecoder<Growable> {
    fn default() -> Self {
        Self::new()
    }
}

impl XzDecoder<Preallocated> {
    /// Create a multi-call decoder that allocates `config.dict_max` bytes
    /// of dictionary now.
    pub fn preallocated(config: DecoderConfig) -> Result<Self> {
        let storage = Preallocated::new(config.dict_max)?;
        Ok(Self::from_parts(storage, config))
    }
}

impl XzDecoder<Direct> {
    /// Create a single-shot decoder that uses the caller's output buffer as
    /// its dictionary.
    pub fn single_shot(config: DecoderConfig) -> Self {
        Self::from_parts(Direct::new(), config)
    }
}

impl<S: DictStorage> XzDecoder<S> {
    fn from_parts(storage: S, config: DecoderConfig) -> Self {
        let mut decoder = Self {
            config,
            sequence: Sequence::StreamHeader,
            in_start: 0,
            vli: VliDecoder::new(),
            check: BlockCheck::new(CheckKind::None),
            block_header: BlockHeader::default(),
            blocks: Blocks::default(),
            index: Index::default(),
            temp: Temp {
                buf: [0; TEMP_SIZE],
                pos: 0,
                size: 0,
            },
            lzma2: Lzma2Decoder::new(storage),
            filters: FilterSet::new(),
            allow_stall: false,
            failed: None,
            stats: StreamStats::default(),
        };
        decoder.restart();
        decoder
    }

    /// Register a post-filter for blocks that name `id` (0x04 to 0x0B).
    pub fn register_filter(&mut self, id: u8, filter: Box<dyn PostFilter>) -> Result<()> {
        self.filters.register(id, filter)
    }

    /// Configuration in use.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Dictionary storage strategy.
    pub fn mode(&self) -> DictMode {
        self.lzma2.mode()
    }

    /// Statistics of the stream decoded so far.
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Prepare for a new stream. Dictionary memory is kept.
    pub fn reset(&mut self) {
        self.restart();
    }

    fn restart(&mut self) {
        self.sequence = Sequence::StreamHeader;
        self.in_start = 0;
        self.vli = VliDecoder::new();
        self.check = BlockCheck::new(CheckKind::None);
        self.block_header = BlockHeader::default();
        self.blocks = Blocks::default();
        self.index = Index::default();
        self.temp.begin(STREAM_HEADER_SIZE);
        self.allow_stall = false;
        self.failed = None;
        self.stats = StreamStats::default();
    }

    /// Decode as much as the buffers allow.
    ///
    /// Multi-call decoders return [`DecompressStatus::Done`] at the end of
    /// the stream, [`NeedsInput`](DecompressStatus::NeedsInput) or
    /// [`NeedsOutput`](DecompressStatus::NeedsOutput) when suspended, and
    /// [`Stalled`](DecompressStatus::Stalled) on the second consecutive call
    /// that could make no progress.
    ///
    /// Single-shot decoders start from scratch on every call. If the stream
    /// does not end, both cursors are rewound; input that ends too early
    /// is a data error and an output buffer that is too small gives
    /// `Stalled`.
    pub fn decode(&mut self, buf: &mut InOutBuffer<'_>) -> Result<DecompressStatus> {
        if let Some(kind) = self.failed {
            return Err(XzError::Failed { kind });
        }

        let single_shot = S::MODE == DictMode::Direct;
        if single_shot {
            self.restart();
        }

        let in_start = buf.in_pos();
        let out_start = buf.out_pos();

        let done = match self.run(buf) {
            Ok(done) => done,
            Err(err) => {
                tracing::debug!(error = %err, "stream decoding failed");
                self.failed = Some(err.kind());
                if single_shot {
                    buf.set_in_pos(in_start);
                    buf.set_out_pos(out_start);
                }
                return Err(err);
            }
        };

        self.stats.total_in += (buf.in_pos() - in_start) as u64;
        self.stats.total_out += (buf.out_pos() - out_start) as u64;

        if done {
            self.allow_stall = false;
            return Ok(DecompressStatus::Done);
        }

        if single_shot {
            let truncated = buf.input_exhausted();
            buf.set_in_pos(in_start);
            buf.set_out_pos(out_start);
            if truncated {
                self.failed = Some(ErrorKind::Data);
                return Err(XzError::truncated());
            }
            return Ok(DecompressStatus::Stalled);
        }

        let progressed = buf.in_pos() != in_start || buf.out_pos() != out_start;
        if !progressed {
            if self.allow_stall {
                return Ok(DecompressStatus::Stalled);
            }
            self.allow_stall = true;
        } else {
            self.allow_stall = false;
        }

        Ok(if buf.output_full() {
            DecompressStatus::NeedsOutput
        } else {
            DecompressStatus::NeedsInput
        })
    }

    /// Run the phase machine. Returns `Ok(true)` at the end of the stream.
    fn run(&mut self, buf: &mut InOutBuffer<'_>) -> Result<bool> {
        self.in_start = buf.in_pos();

        loop {
            match self.sequence {
                Sequence::StreamHeader => {
                    if !self.temp.fill(buf) {
                        return Ok(false);
                    }
                    self.decode_stream_header()?;
                    self.sequence = Sequence::BlockStart;
                }
                Sequence::BlockStart => {
                    let Some(byte) = buf.peek_byte() else {
                        return Ok(false);
                    };
                    if byte == 0x00 {
                        // Index indicator; it counts toward the index size.
                        self.in_start = buf.in_pos();
                        buf.advance_input(1);
                        self.sequence = Sequence::Index;
                        continue;
                    }
                    self.temp.begin((byte as usize + 1) * 4);
                    self.sequence = Sequence::BlockHeader;
                }
                Sequence::BlockHeader => {
                    if !self.temp.fill(buf) {
                        return Ok(false);
                    }
                    self.decode_block_header()?;
                    self.sequence = Sequence::BlockData;
                }
                Sequence::BlockData => {
                    if !self.decode_block(buf)? {
                        return Ok(false);
                    }
                    self.sequence = Sequence::BlockPadding;
                }
                Sequence::BlockPadding => {
                    while self.blocks.compressed & 3 != 0 {
                        let Some(byte) = buf.read_byte() else {
                            return Ok(false);
                        };
                        if byte != 0x00 {
                            return Err(XzError::corrupted("non-zero block padding"));
                        }
                        self.blocks.compressed += 1;
                    }
                    self.temp.begin(self.check.kind().size());
                    self.sequence = Sequence::BlockCheck;
                }
                Sequence::BlockCheck => {
                    if !self.temp.fill(buf) {
                        return Ok(false);
                    }
                    self.check
                        .verify(self.temp.bytes(), self.blocks.count - 1)?;
                    self.sequence = Sequence::BlockStart;
                }
                Sequence::Index => {
                    if !self.decode_index(buf)? {
                        return Ok(false);
                    }
                    self.sequence = Sequence::IndexPadding;
                }
                Sequence::IndexPadding => {
                    while (self.index.size + (buf.in_pos() - self.in_start) as u64) & 3 != 0 {
                        let Some(byte) = buf.read_byte() else {
                            self.index_update(buf);
                            return Ok(false);
                        };
                        if byte != 0x00 {
                            return Err(XzError::corrupted("non-zero index padding"));
                        }
                    }
                    self.index_update(buf);

                    if self.blocks.hash != self.index.hash {
                        return Err(XzError::corrupted("index does not match the blocks"));
                    }
                    self.temp.begin(4);
                    self.sequence = Sequence::IndexCrc32;
                }
                Sequence::IndexCrc32 => {
                    if !self.temp.fill(buf) {
                        return Ok(false);
                    }
                    let stored = le_u32(self.temp.bytes());
                    if stored != self.index.crc32 {
                        return Err(XzError::crc_mismatch(
                            "Index CRC32",
                            stored as u64,
                            self.index.crc32 as u64,
                        ));
                    }
                    tracing::debug!(
                        records = self.blocks.count,
                        size = self.index.size + 4,
                        "index verified"
                    );
                    self.temp.begin(STREAM_HEADER_SIZE);
                    self.sequence = Sequence::StreamFooter;
                }
                Sequence::StreamFooter => {
                    if !self.temp.fill(buf) {
                        return Ok(false);
                    }
                    parse_stream_footer(self.temp.bytes(), self.index.size, self.check.kind())?;
                    self.stats.index_size = self.index.size + 4;
                    tracing::debug!(
                        blocks = self.blocks.count,
                        uncompressed = self.blocks.hash.uncompressed,
                        "stream end"
                    );
                    self.sequence = Sequence::Done;
                    return Ok(true);
                }
                Sequence::Done => return Ok(true),
            }
        }
    }

    fn decode_stream_header(&mut self) -> Result<()> {
        let kind = parse_stream_header(self.temp.bytes())?;

        if !kind.is_supported() {
            match self.config.check_policy {
                CheckPolicy::Reject => {
                    return Err(XzError::unsupported(format!("check type {kind}")));
                }
                CheckPolicy::Skip => {
                    tracing::warn!(check = %kind, "unsupported check type, integrity will not be verified");
                }
            }
        }

        tracing::debug!(check = %kind, "stream header");
        self.check = BlockCheck::new(kind);
        self.stats.check = Some(kind);
        Ok(())
    }

    fn decode_block_header(&mut self) -> Result<()> {
        let header = self.temp.bytes();
        let body_len = header.len() - 4;
        let body = &header[..body_len];

        let stored = le_u32(&header[body_len..]);
        let computed = crc32(body, 0);
        if stored != computed {
            return Err(XzError::crc_mismatch(
                "Block header CRC32",
                stored as u64,
                computed as u64,
            ));
        }

        // Bit 0: a post-filter precedes LZMA2. Bits 1-5 would mean more
        // filters or reserved flags.
        let flags = body[1];
        if flags & 0x3E != 0 {
            return Err(XzError::unsupported(format!("block flags {flags:#04x}")));
        }

        let mut pos = 2;
        let compressed = if flags & 0x40 != 0 {
            Some(header_vli(body, &mut pos)?)
        } else {
            None
        };
        let uncompressed = if flags & 0x80 != 0 {
            Some(header_vli(body, &mut pos)?)
        } else {
            None
        };

        let filter = if flags & 0x01 != 0 {
            if body_len - pos < 2 {
                return Err(XzError::unsupported("truncated filter flags"));
            }
            let id = body[pos];
            if !self.filters.contains(id) {
                return Err(XzError::unsupported(format!("filter {id:#04x}")));
            }
            if body[pos + 1] != 0x00 {
                return Err(XzError::unsupported(format!(
                    "properties for filter {id:#04x}"
                )));
            }
            pos += 2;
            Some(id)
        } else {
            None
        };

        if body_len - pos < 2 {
            return Err(XzError::corrupted("block header too short for filter flags"));
        }
        if body[pos] != FILTER_LZMA2 {
            return Err(XzError::unsupported(format!("filter {:#04x}", body[pos])));
        }
        if body[pos + 1] != 0x01 {
            return Err(XzError::unsupported(format!(
                "LZMA2 properties size {}",
                body[pos + 1]
            )));
        }
        pos += 2;

        let Some(&dict_props) = body.get(pos) else {
            return Err(XzError::corrupted("block header too short for LZMA2 properties"));
        };
        pos += 1;

        if body[pos..].iter().any(|&b| b != 0x00) {
            return Err(XzError::unsupported("non-zero block header padding"));
        }
        let size = header.len();

        if filter.is_some() && S::MODE == DictMode::Direct {
            // Filters rewrite the output in place, which is the direct
            // dictionary's history.
            return Err(XzError::unsupported("post-filters need a ring dictionary"));
        }

        self.lzma2.reset(dict_props)?;
        if let Some(id) = filter {
            self.filters.reset(id);
        }

        self.block_header = BlockHeader {
            size,
            compressed,
            uncompressed,
            filter,
            dict_size: self.lzma2.dict_size() as u32,
        };
        self.blocks.compressed = 0;
        self.blocks.uncompressed = 0;
        self.check.reset();

        tracing::trace!(
            header_size = size,
            compressed = ?compressed,
            uncompressed = ?uncompressed,
            filter = ?filter,
            dict_size = self.block_header.dict_size,
            "block header"
        );
        Ok(())
    }

    fn decode_block(&mut self, buf: &mut InOutBuffer<'_>) -> Result<bool> {
        let in_start = buf.in_pos();
        let out_start = buf.out_pos();

        let done = self.lzma2.decode(buf)?;

        self.blocks.compressed += (buf.in_pos() - in_start) as u64;
        self.blocks.uncompressed += (buf.out_pos() - out_start) as u64;

        let header = &self.block_header;
        if header.compressed.is_some_and(|declared| self.blocks.compressed > declared) {
            return Err(XzError::corrupted("block is larger than its declared compressed size"));
        }
        if header
            .uncompressed
            .is_some_and(|declared| self.blocks.uncompressed > declared)
        {
            return Err(XzError::corrupted(
                "block is larger than its declared uncompressed size",
            ));
        }

        if let Some(id) = header.filter {
            self.filters.apply(id, buf.produced_since_mut(out_start));
        }
        self.check.update(buf.produced_since(out_start));

        if !done {
            return Ok(false);
        }

        if let Some(declared) = header.compressed {
            if declared != self.blocks.compressed {
                return Err(XzError::size_mismatch(
                    "Block compressed",
                    declared,
                    self.blocks.compressed,
                ));
            }
        }
        if let Some(declared) = header.uncompressed {
            if declared != self.blocks.uncompressed {
                return Err(XzError::size_mismatch(
                    "Block uncompressed",
                    declared,
                    self.blocks.uncompressed,
                ));
            }
        }

        let unpadded = header.size as u64 + self.blocks.compressed + self.check.kind().size() as u64;
        self.blocks.hash.record(unpadded, self.blocks.uncompressed);
        self.blocks.count += 1;

        self.stats.blocks.push(BlockRecord {
            unpadded_size: unpadded,
            uncompressed_size: self.blocks.uncompressed,
            dict_size: header.dict_size,
            filter: header.filter,
        });
        tracing::debug!(
            block = self.blocks.count - 1,
            unpadded,
            uncompressed = self.blocks.uncompressed,
            "block end"
        );
        Ok(true)
    }

    fn decode_index(&mut self, buf: &mut InOutBuffer<'_>) -> Result<bool> {
        loop {
            let mut pos = buf.in_pos();
            let complete = self.vli.decode(buf.input(), &mut pos);
            buf.set_in_pos(pos);
            if !complete? {
                self.index_update(buf);
                return Ok(false);
            }

            let value = self.vli.value();
            match self.index.sequence {
                IndexSequence::Count => {
                    if value != self.blocks.count {
                        return Err(XzError::size_mismatch(
                            "Index record count",
                            value,
                            self.blocks.count,
                        ));
                    }
                    self.index.count = value;
                    self.index.sequence = IndexSequence::Unpadded;
                }
                IndexSequence::Unpadded => {
                    self.index.pending_unpadded = value;
                    self.index.sequence = IndexSequence::Uncompressed;
                }
                IndexSequence::Uncompressed => {
                    self.index.hash.record(self.index.pending_unpadded, value);
                    self.index.count -= 1;
                    self.index.sequence = IndexSequence::Unpadded;
                }
            }

            if self.index.count == 0 {
                return Ok(true);
            }
        }
    }

    /// Fold index bytes consumed since `in_start` into the size and CRC32.
    fn index_update(&mut self, buf: &InOutBuffer<'_>) {
        let used = &buf.input()[self.in_start..buf.in_pos()];
        self.index.size += used.len() as u64;
        self.index.crc32 = crc32(used, self.index.crc32);
        self.in_start = buf.in_pos();
    }
}

/// Read one VLI that must end inside the block header.
fn header_vli(body: &[u8], pos: &mut usize) -> Result<u64> {
    let mut vli = VliDecoder::new();
    if !vli.decode(body, pos)? {
        return Err(XzError::corrupted("block header size field runs past the header"));
    }
    Ok(vli.value())
}

impl<S: DictStorage> Decompressor for XzDecoder<S> {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)> {
        let mut buf = InOutBuffer::new(input, output);
        let status = self.decode(&mut buf)?;
        Ok((buf.in_pos(), buf.out_pos(), status))
    }

    fn reset(&mut self) {
        self.restart();
    }

    fn is_finished(&self) -> bool {
        self.sequence == Sequence::Done
    }
}
