//! Core traits for streaming decompression.

use crate::error::{Result, XzError};

/// Status of a streaming decompression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// More input is needed to continue decompression.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// Decompression is complete.
    Done,
    /// Two consecutive calls made no progress. Not fatal: the caller must
    /// supply more input or more output space before calling again.
    Stalled,
}

/// A streaming decompressor (decoder).
///
/// Implementations are resumable: any call may stop in the middle of a
/// header, chunk, or match and pick up exactly where it left off on the next
/// call.
pub trait Decompressor {
    /// Decompress data from input to output.
    ///
    /// # Arguments
    ///
    /// * `input` - Input compressed data
    /// * `output` - Output buffer for decompressed data
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, status)
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)>;

    /// Reset the decompressor to its initial state.
    fn reset(&mut self);

    /// Check if the decompressor has finished.
    fn is_finished(&self) -> bool;

    /// Decompress all data at once (convenience method).
    ///
    /// Input that ends before the decompressor reports [`DecompressStatus::Done`]
    /// is an error.
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, status) = self.decompress(&input[input_pos..], &mut buffer)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                DecompressStatus::Done => break,
                DecompressStatus::NeedsInput | DecompressStatus::Stalled
                    if input_pos >= input.len() && produced == 0 =>
                {
                    return Err(XzError::truncated());
                }
                _ => continue,
            }
        }

        Ok(output)
    }
}
