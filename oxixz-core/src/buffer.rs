//! Input/output cursors for streaming decode calls.
//!
//! Every decoding layer receives one [`InOutBuffer`]: a read-only input slice
//! with a consume position and a writable output slice with a produce
//! position. Layers advance the positions in place; either side may run out
//! in the middle of an operation, in which case the layer suspends and the
//! caller comes back with fresh buffers.

/// Paired input and output cursors.
///
/// # Example
///
/// ```
/// use oxixz_core::InOutBuffer;
///
/// let input = b"abc";
/// let mut output = [0u8; 2];
/// let mut buf = InOutBuffer::new(input, &mut output);
///
/// while let Some(byte) = buf.read_byte() {
///     if buf.write_output(&[byte.to_ascii_uppercase()]) == 0 {
///         buf.set_in_pos(buf.in_pos() - 1);
///         break;
///     }
/// }
/// assert_eq!(buf.in_pos(), 2);
/// assert!(buf.output_full());
/// assert_eq!(buf.output(), b"AB");
/// ```
#[derive(Debug)]
pub struct InOutBuffer<'a> {
    input: &'a [u8],
    in_pos: usize,
    output: &'a mut [u8],
    out_pos: usize,
}

impl<'a> InOutBuffer<'a> {
    /// Wrap an input and an output slice, both cursors at zero.
    pub fn new(input: &'a [u8], output: &'a mut [u8]) -> Self {
        Self {
            input,
            in_pos: 0,
            output,
            out_pos: 0,
        }
    }

    /// The whole input slice, independent of the cursor.
    #[inline]
    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    /// Unconsumed input.
    #[inline]
    pub fn remaining_input(&self) -> &'a [u8] {
        &self.input[self.in_pos..]
    }

    /// Current input position.
    #[inline]
    pub fn in_pos(&self) -> usize {
        self.in_pos
    }

    /// Total input length.
    #[inline]
    pub fn in_len(&self) -> usize {
        self.input.len()
    }

    /// Number of unconsumed input bytes.
    #[inline]
    pub fn in_remaining(&self) -> usize {
        self.input.len() - self.in_pos
    }

    /// Whether all input has been consumed.
    #[inline]
    pub fn input_exhausted(&self) -> bool {
        self.in_pos == self.input.len()
    }

    /// Look at the next input byte without consuming it.
    #[inline]
    pub fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.in_pos).copied()
    }

    /// Consume one input byte.
    #[inline]
    pub fn read_byte(&mut self) -> Option<u8> {
        let byte = self.peek_byte()?;
        self.in_pos += 1;
        Some(byte)
    }

    /// Consume `n` input bytes. `n` must not exceed [`in_remaining`](Self::in_remaining).
    #[inline]
    pub fn advance_input(&mut self, n: usize) {
        debug_assert!(n <= self.in_remaining());
        self.in_pos += n;
    }

    /// Move the input cursor to an absolute position.
    #[inline]
    pub fn set_in_pos(&mut self, pos: usize) {
        debug_assert!(pos <= self.input.len());
        self.in_pos = pos;
    }

    /// Current output position.
    #[inline]
    pub fn out_pos(&self) -> usize {
        self.out_pos
    }

    /// Total output capacity.
    #[inline]
    pub fn out_len(&self) -> usize {
        self.output.len()
    }

    /// Free output space.
    #[inline]
    pub fn out_remaining(&self) -> usize {
        self.output.len() - self.out_pos
    }

    /// Whether the output slice is full.
    #[inline]
    pub fn output_full(&self) -> bool {
        self.out_pos == self.output.len()
    }

    /// Bytes produced so far.
    #[inline]
    pub fn output(&self) -> &[u8] {
        &self.output[..self.out_pos]
    }

    /// The whole output slice, including the unwritten tail.
    #[inline]
    pub fn output_mut(&mut self) -> &mut [u8] {
        &mut self.output[..]
    }

    /// Bytes produced since output position `start`.
    #[inline]
    pub fn produced_since(&self, start: usize) -> &[u8] {
        &self.output[start..self.out_pos]
    }

    /// Mutable view of bytes produced since output position `start`.
    #[inline]
    pub fn produced_since_mut(&mut self, start: usize) -> &mut [u8] {
        &mut self.output[start..self.out_pos]
    }

    /// Mark `n` more output bytes as produced.
    #[inline]
    pub fn advance_output(&mut self, n: usize) {
        debug_assert!(n <= self.out_remaining());
        self.out_pos += n;
    }

    /// Move the output cursor to an absolute position.
    #[inline]
    pub fn set_out_pos(&mut self, pos: usize) {
        debug_assert!(pos <= self.output.len());
        self.out_pos = pos;
    }

    /// Append as much of `data` as fits; returns the number of bytes written.
    pub fn write_output(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.out_remaining());
        self.output[self.out_pos..self.out_pos + n].copy_from_slice(&data[..n]);
        self.out_pos += n;
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursors_start_at_zero() {
        let input = [1u8, 2, 3];
        let mut output = [0u8; 4];
        let buf = InOutBuffer::new(&input, &mut output);

        assert_eq!(buf.in_pos(), 0);
        assert_eq!(buf.out_pos(), 0);
        assert_eq!(buf.in_remaining(), 3);
        assert_eq!(buf.out_remaining(), 4);
        assert!(!buf.input_exhausted());
        assert!(!buf.output_full());
    }

    #[test]
    fn test_read_and_peek() {
        let input = [7u8, 8];
        let mut output = [0u8; 0];
        let mut buf = InOutBuffer::new(&input, &mut output);

        assert_eq!(buf.peek_byte(), Some(7));
        assert_eq!(buf.read_byte(), Some(7));
        assert_eq!(buf.read_byte(), Some(8));
        assert_eq!(buf.read_byte(), None);
        assert!(buf.input_exhausted());
        assert!(buf.output_full());
    }

    #[test]
    fn test_write_output_truncates() {
        let mut output = [0u8; 3];
        let mut buf = InOutBuffer::new(&[], &mut output);

        assert_eq!(buf.write_output(b"ab"), 2);
        assert_eq!(buf.write_output(b"cd"), 1);
        assert_eq!(buf.output(), b"abc");
        assert_eq!(buf.produced_since(1), b"bc");
    }

    #[test]
    fn test_produced_since_mut() {
        let mut output = [0u8; 4];
        let mut buf = InOutBuffer::new(&[], &mut output);
        buf.write_output(b"abcd");
        buf.produced_since_mut(2).make_ascii_uppercase();
        assert_eq!(buf.output(), b"abCD");
    }

    #[test]
    fn test_rewind() {
        let input = [1u8, 2, 3, 4];
        let mut output = [0u8; 4];
        let mut buf = InOutBuffer::new(&input, &mut output);

        buf.advance_input(3);
        assert_eq!(buf.write_output(&input[..3]), 3);
        buf.set_in_pos(1);
        buf.set_out_pos(0);
        assert_eq!(buf.remaining_input(), &[2, 3, 4]);
        assert!(buf.output().is_empty());
    }
}
