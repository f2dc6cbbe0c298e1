//! Concatenated streams, one-shot helpers, and an [`io::Read`] adapter.
//!
//! A `.xz` file is one or more streams, each optionally followed by stream
//! padding: null bytes in multiples of four.

use crate::config::DecoderConfig;
use crate::decoder::XzDecoder;
use crate::filter::PostFilter;
use crate::stats::StreamStats;
use oxixz_core::{DecompressStatus, Decompressor, InOutBuffer, Result, XzError};
use oxixz_lzma::{DictStorage, Growable};
use std::io::{self, Read};

/// Output chunk used by the one-shot helpers.
const CHUNK_SIZE: usize = 64 * 1024;

/// Input buffer of [`XzReader`].
const READ_BUF_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InStream,
    Padding,
}

/// Decoder for a sequence of concatenated streams with stream padding.
///
/// Reports [`DecompressStatus::Done`] only from [`finish`](Self::finish):
/// more streams may always follow, so the caller decides when the input
/// has ended.
#[derive(Debug)]
pub struct MultiStreamDecoder<S: DictStorage = Growable> {
    decoder: XzDecoder<S>,
    state: State,
    /// Null bytes seen since the last stream ended.
    padding: u64,
    streams: Vec<StreamStats>,
}

impl MultiStreamDecoder<Growable> {
    /// Create a decoder with the default configuration.
    pub fn new() -> Self {
        Self::with_decoder(XzDecoder::new())
    }

    /// Create a decoder with a growable dictionary.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self::with_decoder(XzDecoder::with_config(config))
    }
}

impl Default for MultiStreamDecoder<Growable> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DictStorage> MultiStreamDecoder<S> {
    /// Wrap a stream decoder. Its registered filters apply to every stream.
    pub fn with_decoder(decoder: XzDecoder<S>) -> Self {
        Self {
            decoder,
            state: State::InStream,
            padding: 0,
            streams: Vec::new(),
        }
    }

    /// Register a post-filter on the inner decoder.
    pub fn register_filter(&mut self, id: u8, filter: Box<dyn PostFilter>) -> Result<()> {
        self.decoder.register_filter(id, filter)
    }

    /// Statistics of every completed stream, in order.
    pub fn streams(&self) -> &[StreamStats] {
        &self.streams
    }

    /// Decode as much as the buffers allow.
    ///
    /// Never returns [`DecompressStatus::Done`].
    pub fn decode(&mut self, buf: &mut InOutBuffer<'_>) -> Result<DecompressStatus> {
        loop {
            match self.state {
                State::InStream => {
                    let status = self.decoder.decode(buf)?;
                    if status != DecompressStatus::Done {
                        return Ok(status);
                    }
                    self.streams.push(self.decoder.stats().clone());
                    tracing::debug!(stream = self.streams.len() - 1, "stream complete");
                    self.state = State::Padding;
                    self.padding = 0;
                }
                State::Padding => {
                    while buf.peek_byte() == Some(0x00) {
                        buf.advance_input(1);
                        self.padding += 1;
                    }
                    if buf.input_exhausted() {
                        return Ok(DecompressStatus::NeedsInput);
                    }
                    if self.padding % 4 != 0 {
                        return Err(XzError::corrupted(
                            "stream padding is not a multiple of four bytes",
                        ));
                    }
                    self.decoder.reset();
                    self.state = State::InStream;
                }
            }
        }
    }

    /// Declare the end of input.
    ///
    /// Fails if no stream has ended yet, if input ended inside a stream, or
    /// if the trailing padding is not a multiple of four bytes.
    pub fn finish(&self) -> Result<()> {
        match self.state {
            State::InStream => Err(XzError::truncated()),
            State::Padding if self.padding % 4 != 0 => Err(XzError::corrupted(
                "stream padding is not a multiple of four bytes",
            )),
            State::Padding => Ok(()),
        }
    }

    /// Prepare for new input.
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.state = State::InStream;
        self.padding = 0;
        self.streams.clear();
    }
}

impl<S: DictStorage> Decompressor for MultiStreamDecoder<S> {
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
        MultiStreamDecoder::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.state == State::Padding && self.padding % 4 == 0
    }

    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        decode_to_end(self, input)
    }
}

/// Decode every stream in `data` into a new vector.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("file.xz")?;
/// let text = oxixz_stream::decompress(&data)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    decompress_with(data, DecoderConfig::default())
}

/// Decode every stream in `data` with the given configuration.
pub fn decompress_with(data: &[u8], config: DecoderConfig) -> Result<Vec<u8>> {
    let mut decoder = MultiStreamDecoder::with_config(config);
    decode_to_end(&mut decoder, data)
}

fn decode_to_end<S: DictStorage>(
    decoder: &mut MultiStreamDecoder<S>,
    data: &[u8],
) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut pos = 0;

    loop {
        let mut buf = InOutBuffer::new(&data[pos..], &mut chunk);
        let status = decoder.decode(&mut buf)?;
        let (consumed, produced) = (buf.in_pos(), buf.out_pos());
        pos += consumed;
        output.extend_from_slice(&chunk[..produced]);

        if status == DecompressStatus::Stalled || (consumed == 0 && produced == 0) {
            break;
        }
    }

    decoder.finish()?;
    Ok(output)
}

/// Decode a single stream straight into `out` with no dictionary memory.
///
/// Returns the number of bytes written. Only null stream padding may
/// follow the stream. An output buffer that cannot hold the whole stream
/// is a buffer error.
pub fn decompress_single(data: &[u8], out: &mut [u8]) -> Result<usize> {
    decompress_single_with(data, out, DecoderConfig::default())
}

/// [`decompress_single`] with the given configuration.
///
/// The window is `out` itself, so `dict_max` has no effect here.
pub fn decompress_single_with(
    data: &[u8],
    out: &mut [u8],
    config: DecoderConfig,
) -> Result<usize> {
    let mut decoder = XzDecoder::single_shot(config);
    let mut buf = InOutBuffer::new(data, out);

    match decoder.decode(&mut buf)? {
        DecompressStatus::Done => {}
        _ => return Err(XzError::buffer_too_small(buf.out_len())),
    }

    let trailing = buf.remaining_input();
    if trailing.iter().any(|&b| b != 0x00) {
        return Err(XzError::corrupted("data after the end of the stream"));
    }
    if trailing.len() % 4 != 0 {
        return Err(XzError::corrupted(
            "stream padding is not a multiple of four bytes",
        ));
    }
    Ok(buf.out_pos())
}

/// Streaming decoder over any [`Read`].
///
/// Decodes concatenated streams; reaching the end of the inner reader in
/// the middle of a stream is an error.
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
/// use std::io::Read;
/// use oxixz_stream::XzReader;
///
/// let mut reader = XzReader::new(File::open("file.xz")?);
/// let mut text = String::new();
/// reader.read_to_string(&mut text)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct XzReader<R: Read> {
    inner: R,
    decoder: MultiStreamDecoder,
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> XzReader<R> {
    /// Wrap a reader with the default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, DecoderConfig::default())
    }

    /// Wrap a reader.
    pub fn with_config(inner: R, config: DecoderConfig) -> Self {
        Self::with_decoder(inner, MultiStreamDecoder::with_config(config))
    }

    /// Wrap a reader with a prepared decoder, for example one with
    /// post-filters registered.
    pub fn with_decoder(inner: R, decoder: MultiStreamDecoder) -> Self {
        Self {
            inner,
            decoder,
            buf: vec![0u8; READ_BUF_SIZE].into_boxed_slice(),
            pos: 0,
            len: 0,
            eof: false,
            finished: false,
        }
    }

    /// Statistics of every completed stream.
    pub fn streams(&self) -> &[StreamStats] {
        self.decoder.streams()
    }

    /// The inner reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the inner reader. Buffered input is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for XzReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() || self.finished {
            return Ok(0);
        }

        loop {
            if self.pos == self.len && !self.eof {
                self.len = self.inner.read(&mut self.buf)?;
                self.pos = 0;
                self.eof = self.len == 0;
            }

            let mut buf = InOutBuffer::new(&self.buf[self.pos..self.len], out);
            let status = self.decoder.decode(&mut buf)?;
            let (consumed, produced) = (buf.in_pos(), buf.out_pos());
            self.pos += consumed;

            if produced > 0 {
                return Ok(produced);
            }
            if self.eof && (consumed == 0 || status == DecompressStatus::Stalled) {
                self.decoder.finish()?;
                self.finished = true;
                return Ok(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: [u8; 32] = [
        0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00, 0x04, 0xE6, 0xD6, 0xB4, 0x46, 0x00, 0x00, 0x00,
        0x00, 0x1C, 0xDF, 0x44, 0x21, 0x1F, 0xB6, 0xF3, 0x7D, 0x01, 0x00, 0x00, 0x00, 0x00, 0x04,
        0x59, 0x5A,
    ];

    #[test]
    fn test_padding_between_streams() {
        let mut data = EMPTY.to_vec();
        data.extend_from_slice(&[0; 8]);
        data.extend_from_slice(&EMPTY);
        data.extend_from_slice(&[0; 4]);

        let mut decoder = MultiStreamDecoder::new();
        let out = decoder.decompress_all(&data).expect("decode");
        assert!(out.is_empty());
        assert_eq!(decoder.streams().len(), 2);
    }

    #[test]
    fn test_misaligned_padding() {
        let mut trailing = EMPTY.to_vec();
        trailing.extend_from_slice(&[0; 3]);
        let err = decompress(&trailing).unwrap_err();
        assert_eq!(err.kind(), oxixz_core::ErrorKind::Data);

        let mut between = EMPTY.to_vec();
        between.extend_from_slice(&[0; 2]);
        between.extend_from_slice(&EMPTY);
        assert!(decompress(&between).is_err());
    }

    #[test]
    fn test_garbage_after_stream() {
        let mut data = EMPTY.to_vec();
        data.extend_from_slice(b"garbage here");
        let err = decompress(&data).unwrap_err();
        assert_eq!(err.kind(), oxixz_core::ErrorKind::Format);

        // Too short to be a stream header.
        let mut short = EMPTY.to_vec();
        short.extend_from_slice(b"junk");
        assert_eq!(
            decompress(&short).unwrap_err().kind(),
            oxixz_core::ErrorKind::Data
        );
    }

    #[test]
    fn test_empty_input_is_truncated() {
        let err = decompress(&[]).unwrap_err();
        assert_eq!(err.kind(), oxixz_core::ErrorKind::Data);
    }

    #[test]
    fn test_single_trailing_data() {
        let mut out = [0u8; 0];
        assert_eq!(decompress_single(&EMPTY, &mut out).expect("plain"), 0);

        let mut padded = EMPTY.to_vec();
        padded.extend_from_slice(&[0; 4]);
        assert_eq!(decompress_single(&padded, &mut out).expect("padded"), 0);

        let mut junk = EMPTY.to_vec();
        junk.push(1);
        assert!(decompress_single(&junk, &mut out).is_err());
    }

    #[test]
    fn test_reader_on_empty_stream() {
        let mut reader = XzReader::new(&EMPTY[..]);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).expect("read");
        assert!(out.is_empty());
        assert_eq!(reader.streams().len(), 1);
    }

    #[test]
    fn test_reader_reports_truncation() {
        let mut reader = XzReader::new(&EMPTY[..20]);
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
