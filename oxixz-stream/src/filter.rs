//! Post-filters applied to a block's output after LZMA2.
//!
//! A block header may list one branch-converter (BCJ) filter ahead of
//! LZMA2. No converters ship with this crate; callers register their own
//! implementations by filter id, and a block naming an unregistered id is
//! rejected with an options error.

use oxixz_core::{Result, XzError};
use std::fmt;

/// Filter ids a block header may place before LZMA2.
pub mod ids {
    /// x86 BCJ.
    pub const X86: u8 = 0x04;
    /// PowerPC (big endian).
    pub const POWERPC: u8 = 0x05;
    /// IA-64.
    pub const IA64: u8 = 0x06;
    /// ARM (little endian).
    pub const ARM: u8 = 0x07;
    /// ARM Thumb.
    pub const ARM_THUMB: u8 = 0x08;
    /// SPARC.
    pub const SPARC: u8 = 0x09;
    /// ARM64.
    pub const ARM64: u8 = 0x0A;
    /// RISC-V.
    pub const RISCV: u8 = 0x0B;
}

/// Whether `id` names a branch-converter filter.
pub fn is_bcj_id(id: u8) -> bool {
    (ids::X86..=ids::RISCV).contains(&id)
}

/// Human-readable name of a filter id.
pub fn filter_name(id: u8) -> Option<&'static str> {
    let name = match id {
        ids::X86 => "x86",
        ids::POWERPC => "powerpc",
        ids::IA64 => "ia64",
        ids::ARM => "arm",
        ids::ARM_THUMB => "armthumb",
        ids::SPARC => "sparc",
        ids::ARM64 => "arm64",
        ids::RISCV => "riscv",
        0x21 => "lzma2",
        _ => return None,
    };
    Some(name)
}

/// Transform applied in place to newly decoded bytes of a block.
///
/// `apply` sees every byte of the block exactly once, in order, split at
/// arbitrary points.
pub trait PostFilter: Send {
    /// Forget all state; called at the start of every block using the filter.
    fn reset(&mut self);

    /// Transform `buf` in place.
    fn apply(&mut self, buf: &mut [u8]);
}

/// Post-filters registered on a decoder, keyed by filter id.
#[derive(Default)]
pub struct FilterSet {
    filters: Vec<(u8, Box<dyn PostFilter>)>,
}

impl FilterSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `filter` for `id`, replacing any earlier registration.
    ///
    /// Only branch-converter ids (0x04 to 0x0B) may be registered.
    pub fn register(&mut self, id: u8, filter: Box<dyn PostFilter>) -> Result<()> {
        if !is_bcj_id(id) {
            return Err(XzError::unsupported(format!(
                "filter {id:#04x} cannot be used as a post-filter"
            )));
        }
        self.filters.retain(|(existing, _)| *existing != id);
        self.filters.push((id, filter));
        Ok(())
    }

    /// Whether a filter is registered for `id`.
    pub fn contains(&self, id: u8) -> bool {
        self.filters.iter().any(|(existing, _)| *existing == id)
    }

    /// Whether no filter is registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Reset the filter registered for `id`.
    pub(crate) fn reset(&mut self, id: u8) {
        for (existing, filter) in &mut self.filters {
            if *existing == id {
                filter.reset();
            }
        }
    }

    /// Run the filter registered for `id` over `buf`.
    pub(crate) fn apply(&mut self, id: u8, buf: &mut [u8]) {
        if buf.is_empty() {
            return;
        }
        for (existing, filter) in &mut self.filters {
            if *existing == id {
                filter.apply(buf);
            }
        }
    }
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|(id, _)| id))
            .finish()
    }
}
