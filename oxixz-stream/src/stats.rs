//! What a decoder learned about a stream.

use crate::header::CheckKind;

/// One block, as recorded when its data ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BlockRecord {
    /// Header, compressed data, and check, without padding.
    pub unpadded_size: u64,
    /// Decoded size.
    pub uncompressed_size: u64,
    /// LZMA2 dictionary size.
    pub dict_size: u32,
    /// Post-filter id, if the block used one.
    pub filter: Option<u8>,
}

/// Per-stream statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StreamStats {
    /// Check kind, once the header has been read.
    pub check: Option<CheckKind>,
    /// Completed blocks, in order.
    pub blocks: Vec<BlockRecord>,
    /// Index size including its CRC32, once the footer has been read.
    pub index_size: u64,
    /// Input bytes consumed.
    pub total_in: u64,
    /// Output bytes produced.
    pub total_out: u64,
}

impl StreamStats {
    /// Sum of the blocks' decoded sizes.
    pub fn uncompressed_size(&self) -> u64 {
        self.blocks.iter().map(|b| b.uncompressed_size).sum()
    }

    /// Largest dictionary any block declared.
    pub fn max_dict_size(&self) -> u32 {
        self.blocks.iter().map(|b| b.dict_size).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let stats = StreamStats {
            check: Some(CheckKind::Crc64),
            blocks: vec![
                BlockRecord {
                    unpadded_size: 100,
                    uncompressed_size: 400,
                    dict_size: 1 << 16,
                    filter: None,
                },
                BlockRecord {
                    unpadded_size: 50,
                    uncompressed_size: 60,
                    dict_size: 1 << 20,
                    filter: Some(0x04),
                },
            ],
            ..StreamStats::default()
        };
        assert_eq!(stats.uncompressed_size(), 460);
        assert_eq!(stats.max_dict_size(), 1 << 20);
        assert_eq!(StreamStats::default().max_dict_size(), 0);
    }
}
