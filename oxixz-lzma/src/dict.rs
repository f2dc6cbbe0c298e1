//! Sliding-window dictionary for LZMA decoding.
//!
//! The dictionary holds the most recent output so matches can copy from it.
//! Three storage strategies are available, chosen by type parameter so the
//! hot paths are monomorphised:
//!
//! - [`Direct`]: single-shot decoding. The caller's output slice *is* the
//!   window; flushing only advances the output cursor.
//! - [`Preallocated`]: a ring of the configured maximum size, allocated once.
//! - [`Growable`]: a ring allocated lazily to the size each stream declares,
//!   never exceeding the configured maximum.
//!
//! ```text
//!   0          start        pos      limit            end
//!   |~~~~~~~~~~~~|############|..........|...............|
//!    older history  unflushed   writable   not this call
//! ```

use oxixz_core::{InOutBuffer, Result, XzError};

mod sealed {
    pub trait Sealed {}
}

/// Which storage strategy a decoder was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictMode {
    /// Window is the caller's output buffer.
    Direct,
    /// Ring allocated once at the maximum size.
    Preallocated,
    /// Ring grown to each stream's declared size.
    Growable,
}

/// Backing memory for a [`Dictionary`].
///
/// Methods receive the caller's whole output slice so that [`Direct`] can use
/// it as the window; ring storages ignore it.
pub trait DictStorage: sealed::Sealed {
    /// Strategy tag.
    const MODE: DictMode;

    /// Prepare for a stream whose window is `size` bytes.
    ///
    /// Returns the ring length, or `None` when the window length is decided
    /// at dictionary reset instead.
    fn prepare(&mut self, size: usize) -> Result<Option<usize>>;

    /// Bind to the caller's output at a dictionary reset.
    ///
    /// Returns the new window length, or `None` to keep the current one.
    fn attach(&mut self, out_pos: usize, out_len: usize) -> Option<usize>;

    /// The window bytes.
    fn window<'a>(&'a self, out: &'a [u8]) -> &'a [u8];

    /// The window bytes, writable.
    fn window_mut<'a>(&'a mut self, out: &'a mut [u8]) -> &'a mut [u8];

    /// Bytes of memory currently held.
    fn allocated(&self) -> usize;
}

/// Window stored directly in the caller's output buffer.
#[derive(Debug, Default)]
pub struct Direct {
    base: usize,
}

impl Direct {
    /// Create a direct storage.
    pub fn new() -> Self {
        Self { base: 0 }
    }
}

impl sealed::Sealed for Direct {}

impl DictStorage for Direct {
    const MODE: DictMode = DictMode::Direct;

    fn prepare(&mut self, _size: usize) -> Result<Option<usize>> {
        Ok(None)
    }

    fn attach(&mut self, out_pos: usize, out_len: usize) -> Option<usize> {
        self.base = out_pos;
        Some(out_len - out_pos)
    }

    #[inline(always)]
    fn window<'a>(&'a self, out: &'a [u8]) -> &'a [u8] {
        &out[self.base..]
    }

    #[inline(always)]
    fn window_mut<'a>(&'a mut self, out: &'a mut [u8]) -> &'a mut [u8] {
        &mut out[self.base..]
    }

    fn allocated(&self) -> usize {
        0
    }
}

/// Ring buffer allocated once at the maximum dictionary size.
#[derive(Debug)]
pub struct Preallocated {
    buf: Box<[u8]>,
}

impl Preallocated {
    /// Allocate a ring of `max` bytes.
    pub fn new(max: usize) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(max)
            .map_err(|_| XzError::out_of_memory(max))?;
        buf.resize(max, 0);
        tracing::debug!(bytes = max, "preallocated dictionary");
        Ok(Self {
            buf: buf.into_boxed_slice(),
        })
    }
}

impl sealed::Sealed for Preallocated {}

impl DictStorage for Preallocated {
    const MODE: DictMode = DictMode::Preallocated;

    fn prepare(&mut self, size: usize) -> Result<Option<usize>> {
        if size > self.buf.len() {
            return Err(XzError::dictionary_too_large(
                size as u64,
                self.buf.len() as u64,
            ));
        }
        Ok(Some(size))
    }

    fn attach(&mut self, _out_pos: usize, _out_len: usize) -> Option<usize> {
        None
    }

    #[inline(always)]
    fn window<'a>(&'a self, _out: &'a [u8]) -> &'a [u8] {
        &self.buf
    }

    #[inline(always)]
    fn window_mut<'a>(&'a mut self, _out: &'a mut [u8]) -> &'a mut [u8] {
        &mut self.buf
    }

    fn allocated(&self) -> usize {
        self.buf.len()
    }
}

/// Ring buffer grown on demand up to a maximum.
#[derive(Debug)]
pub struct Growable {
    buf: Vec<u8>,
    max: usize,
}

impl Growable {
    /// Create an empty ring that may grow to `max` bytes.
    pub fn new(max: usize) -> Self {
        Self {
            buf: Vec::new(),
            max,
        }
    }
}

impl sealed::Sealed for Growable {}

impl DictStorage for Growable {
    const MODE: DictMode = DictMode::Growable;

    fn prepare(&mut self, size: usize) -> Result<Option<usize>> {
        if size > self.max {
            return Err(XzError::dictionary_too_large(size as u64, self.max as u64));
        }
        if self.buf.len() < size {
            // Old contents are never needed across a resize.
            self.buf = Vec::new();
            self.buf
                .try_reserve_exact(size)
                .map_err(|_| XzError::out_of_memory(size))?;
            self.buf.resize(size, 0);
            tracing::debug!(bytes = size, "grew dictionary");
        }
        Ok(Some(size))
    }

    fn attach(&mut self, _out_pos: usize, _out_len: usize) -> Option<usize> {
        None
    }

    #[inline(always)]
    fn window<'a>(&'a self, _out: &'a [u8]) -> &'a [u8] {
        &self.buf
    }

    #[inline(always)]
    fn window_mut<'a>(&'a mut self, _out: &'a mut [u8]) -> &'a mut [u8] {
        &mut self.buf
    }

    fn allocated(&self) -> usize {
        self.buf.len()
    }
}

/// Sliding-window dictionary.
#[derive(Debug)]
pub struct Dictionary<S: DictStorage> {
    storage: S,
    /// Start of bytes not yet flushed to the caller.
    start: usize,
    /// Next write position.
    pos: usize,
    /// Number of valid history bytes, at most `end`.
    full: usize,
    /// Write bound for the current call.
    limit: usize,
    /// Window length; `pos` wraps to zero here.
    end: usize,
    /// Window size declared by the stream; distances must stay below it.
    size: usize,
}

impl<S: DictStorage> Dictionary<S> {
    /// Create a dictionary over `storage`.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            start: 0,
            pos: 0,
            full: 0,
            limit: 0,
            end: 0,
            size: 0,
        }
    }

    /// Storage strategy of this dictionary.
    pub fn mode(&self) -> DictMode {
        S::MODE
    }

    /// Bytes of memory held by the storage.
    pub fn allocated(&self) -> usize {
        self.storage.allocated()
    }

    /// Declared window size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Set the window size for a new stream, allocating if needed.
    pub fn configure(&mut self, size: usize) -> Result<()> {
        self.size = size;
        if let Some(end) = self.storage.prepare(size)? {
            self.end = end;
        }
        Ok(())
    }

    /// Forget all history.
    ///
    /// Direct storage rebinds to the caller's current output position.
    pub fn reset(&mut self, buf: &InOutBuffer<'_>) {
        if let Some(end) = self.storage.attach(buf.out_pos(), buf.out_len()) {
            self.end = end;
        }
        self.start = 0;
        self.pos = 0;
        self.limit = 0;
        self.full = 0;
    }

    /// Allow at most `out_max` more bytes to be written before the next flush.
    #[inline]
    pub fn set_limit(&mut self, out_max: usize) {
        if self.end - self.pos <= out_max {
            self.limit = self.end;
        } else {
            self.limit = self.pos + out_max;
        }
    }

    /// Whether the current limit allows another byte.
    #[inline(always)]
    pub fn has_room(&self) -> bool {
        self.pos < self.limit
    }

    /// Write position within the window.
    #[inline(always)]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of bytes of history available for back-references.
    #[inline(always)]
    pub fn full(&self) -> usize {
        self.full
    }

    /// Byte at zero-based `distance` behind the write position, or 0 when
    /// the history is shorter than that.
    #[inline(always)]
    pub fn get(&self, out: &[u8], distance: usize) -> u8 {
        if distance >= self.full {
            return 0;
        }
        let offset = if distance >= self.pos {
            self.end + self.pos - distance - 1
        } else {
            self.pos - distance - 1
        };
        self.storage.window(out)[offset]
    }

    /// Append one byte.
    #[inline(always)]
    pub fn put(&mut self, out: &mut [u8], byte: u8) {
        self.storage.window_mut(out)[self.pos] = byte;
        self.pos += 1;
        if self.full < self.pos {
            self.full = self.pos;
        }
    }

    /// Copy `*len` bytes from zero-based `distance` back.
    ///
    /// Stops early at the limit, leaving the uncopied remainder in `len`.
    /// Returns `false` when the distance reaches outside the history or the
    /// declared window.
    #[inline]
    pub fn repeat(&mut self, out: &mut [u8], len: &mut u32, distance: usize) -> bool {
        if distance >= self.full || distance >= self.size {
            return false;
        }

        let left = (self.limit - self.pos).min(*len as usize);
        *len -= left as u32;

        let end = self.end;
        let mut back = if distance >= self.pos {
            self.pos + end - distance - 1
        } else {
            self.pos - distance - 1
        };

        let window = self.storage.window_mut(out);
        if distance < self.pos && back + left <= self.pos {
            window.copy_within(back..back + left, self.pos);
            self.pos += left;
        } else {
            // Overlapping or wrapping source: copy bytewise so freshly
            // written bytes are picked up again.
            for _ in 0..left {
                window[self.pos] = window[back];
                self.pos += 1;
                back += 1;
                if back == end {
                    back = 0;
                }
            }
        }

        if self.full < self.pos {
            self.full = self.pos;
        }
        true
    }

    /// Copy up to `*left` bytes of an uncompressed chunk from input.
    ///
    /// Ring storages also copy the bytes to the output immediately.
    pub fn copy_uncompressed(&mut self, buf: &mut InOutBuffer<'_>, left: &mut usize) {
        while *left > 0 && buf.in_remaining() > 0 && buf.out_remaining() > 0 {
            let copy_size = buf
                .in_remaining()
                .min(buf.out_remaining())
                .min(self.end - self.pos)
                .min(*left);
            if copy_size == 0 {
                break;
            }
            *left -= copy_size;

            let in_pos = buf.in_pos();
            let src = &buf.input()[in_pos..in_pos + copy_size];
            let out_pos = buf.out_pos();
            let out = buf.output_mut();

            self.storage.window_mut(out)[self.pos..self.pos + copy_size].copy_from_slice(src);
            self.pos += copy_size;
            if self.full < self.pos {
                self.full = self.pos;
            }

            if S::MODE != DictMode::Direct {
                if self.pos == self.end {
                    self.pos = 0;
                }
                out[out_pos..out_pos + copy_size].copy_from_slice(src);
            }

            self.start = self.pos;
            buf.advance_output(copy_size);
            buf.advance_input(copy_size);
        }
    }

    /// Move bytes produced since the last flush to the caller's output.
    ///
    /// Returns the number of bytes flushed.
    pub fn flush(&mut self, buf: &mut InOutBuffer<'_>) -> usize {
        let copy_size = self.pos - self.start;

        if S::MODE != DictMode::Direct {
            if self.pos == self.end {
                self.pos = 0;
            }
            let out_pos = buf.out_pos();
            let out = buf.output_mut();
            let (start, end) = (self.start, self.start + copy_size);
            out[out_pos..out_pos + copy_size]
                .copy_from_slice(&self.storage.window(&[])[start..end]);
        }

        self.start = self.pos;
        buf.advance_output(copy_size);
        copy_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flush_all<S: DictStorage>(dict: &mut Dictionary<S>, out: &mut [u8]) -> Vec<u8> {
        let mut buf = InOutBuffer::new(&[], out);
        let n = dict.flush(&mut buf);
        buf.output()[..n].to_vec()
    }

    #[test]
    fn test_growable_respects_limit() {
        let mut dict = Dictionary::new(Growable::new(4096));
        assert!(dict.configure(4096).is_ok());
        assert_eq!(dict.allocated(), 4096);

        let err = dict.configure(8192).unwrap_err();
        assert!(matches!(err, XzError::DictionaryTooLarge { .. }));
    }

    #[test]
    fn test_growable_does_not_shrink() {
        let mut dict = Dictionary::new(Growable::new(1 << 16));
        dict.configure(1 << 14).expect("configure");
        dict.configure(1 << 12).expect("configure");
        assert_eq!(dict.allocated(), 1 << 14);
        assert_eq!(dict.size(), 1 << 12);
    }

    #[test]
    fn test_preallocated_rejects_larger_window() {
        let storage = Preallocated::new(4096).expect("alloc");
        let mut dict = Dictionary::new(storage);
        assert!(dict.configure(4096).is_ok());
        assert!(dict.configure(6144).is_err());
    }

    #[test]
    fn test_put_get_repeat() {
        let mut dict = Dictionary::new(Growable::new(4096));
        dict.configure(4096).expect("configure");
        let mut scratch = [0u8; 0];
        dict.reset(&InOutBuffer::new(&[], &mut scratch));
        dict.set_limit(100);

        let mut out = [0u8; 128];
        for &b in b"abc" {
            dict.put(&mut out, b);
        }
        assert_eq!(dict.get(&out, 0), b'c');
        assert_eq!(dict.get(&out, 2), b'a');
        assert_eq!(dict.get(&out, 3), 0);

        // Overlapping copy: distance 2 (zero-based) repeats "abc".
        let mut len = 7;
        assert!(dict.repeat(&mut out, &mut len, 2));
        assert_eq!(len, 0);

        assert_eq!(flush_all(&mut dict, &mut out), b"abcabcabca");
    }

    #[test]
    fn test_repeat_rejects_far_distance() {
        let mut dict = Dictionary::new(Growable::new(4096));
        dict.configure(4096).expect("configure");
        let mut scratch = [0u8; 0];
        dict.reset(&InOutBuffer::new(&[], &mut scratch));
        dict.set_limit(10);

        let mut out = [0u8; 0];
        dict.put(&mut out, b'x');
        let mut len = 2;
        assert!(!dict.repeat(&mut out, &mut len, 1));
        assert!(dict.repeat(&mut out, &mut len, 0));
    }

    #[test]
    fn test_repeat_stops_at_limit() {
        let mut dict = Dictionary::new(Growable::new(4096));
        dict.configure(4096).expect("configure");
        let mut scratch = [0u8; 0];
        dict.reset(&InOutBuffer::new(&[], &mut scratch));
        dict.set_limit(4);

        let mut out = [0u8; 0];
        dict.put(&mut out, b'z');
        let mut len = 10;
        assert!(dict.repeat(&mut out, &mut len, 0));
        assert_eq!(len, 7);
        assert!(!dict.has_room());
    }

    #[test]
    fn test_ring_wraps() {
        let mut dict = Dictionary::new(Growable::new(4096));
        dict.configure(4096).expect("configure");
        let mut scratch = [0u8; 0];
        dict.reset(&InOutBuffer::new(&[], &mut scratch));

        let mut out = vec![0u8; 8192];
        let mut produced = Vec::new();
        for round in 0..3u8 {
            dict.set_limit(3000);
            while dict.has_room() {
                dict.put(&mut [], round.wrapping_mul(7).wrapping_add(dict.pos() as u8));
            }
            produced.extend(flush_all(&mut dict, &mut out));
        }
        assert_eq!(produced.len(), 3000 + 1096 + 3000);
        assert_eq!(dict.full(), 4096);

        // The last byte written is reachable at distance 0 after the wrap.
        assert_eq!(dict.get(&[], 0), *produced.last().expect("non-empty"));
        assert_eq!(dict.get(&[], 4095), produced[produced.len() - 4096]);
    }

    #[test]
    fn test_repeat_across_wrap() {
        let mut dict = Dictionary::new(Growable::new(4096));
        dict.configure(4096).expect("configure");
        let mut scratch = [0u8; 0];
        dict.reset(&InOutBuffer::new(&[], &mut scratch));

        let mut out = vec![0u8; 8192];
        dict.set_limit(4090);
        for i in 0..4090u32 {
            dict.put(&mut [], (i % 251) as u8);
        }
        flush_all(&mut dict, &mut out);

        // Copy 20 bytes from 100 back; the write wraps past the end.
        dict.set_limit(20);
        let mut len = 20;
        assert!(dict.repeat(&mut [], &mut len, 99));
        assert_eq!(len, 14);
        let first = flush_all(&mut dict, &mut out);
        dict.set_limit(20);
        assert!(dict.repeat(&mut [], &mut len, 99));
        assert_eq!(len, 0);
        let second = flush_all(&mut dict, &mut out);

        let expected: Vec<u8> = (3990..4010u32).map(|i| (i % 251) as u8).collect();
        assert_eq!([first, second].concat(), expected);
    }

    #[test]
    fn test_direct_writes_into_output() {
        let mut dict = Dictionary::new(Direct::new());
        dict.configure(1 << 20).expect("configure");

        let mut out = [0u8; 16];
        let mut buf = InOutBuffer::new(&[], &mut out);
        buf.write_output(b"xy");
        dict.reset(&buf);
        dict.set_limit(buf.out_remaining());

        let window = buf.output_mut();
        dict.put(window, b'h');
        dict.put(window, b'i');
        let mut len = 3;
        assert!(dict.repeat(window, &mut len, 1));
        assert_eq!(dict.flush(&mut buf), 5);
        assert_eq!(buf.output(), b"xyhihih");
    }

    #[test]
    fn test_copy_uncompressed_ring_and_direct() {
        let input = b"uncompressed payload";

        let mut ring = Dictionary::new(Growable::new(4096));
        ring.configure(4096).expect("configure");
        let mut out = [0u8; 8];
        let mut buf = InOutBuffer::new(input, &mut out);
        ring.reset(&buf);
        let mut left = input.len();
        ring.copy_uncompressed(&mut buf, &mut left);
        assert_eq!(buf.output(), b"uncompre");
        assert_eq!(left, input.len() - 8);
        assert_eq!(ring.get(&[], 0), b'e');

        let mut direct = Dictionary::new(Direct::new());
        direct.configure(4096).expect("configure");
        let mut out = [0u8; 32];
        let mut buf = InOutBuffer::new(input, &mut out);
        direct.reset(&buf);
        let mut left = input.len();
        direct.copy_uncompressed(&mut buf, &mut left);
        assert_eq!(left, 0);
        assert_eq!(buf.output(), input);
        assert_eq!(direct.full(), input.len());
    }
}
