//! Decoder configuration.

/// Default dictionary limit: 64 MiB, enough for every `xz` preset.
pub const DEFAULT_DICT_MAX: usize = 64 << 20;

/// What to do with a stream whose check id is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckPolicy {
    /// Decode anyway; the check bytes are consumed unverified and a warning
    /// is logged.
    #[default]
    Skip,
    /// Fail with an options error.
    Reject,
}

/// Stream decoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Largest dictionary a stream may declare. With preallocated storage
    /// this much memory is allocated up front.
    pub dict_max: usize,
    /// Handling of reserved check ids.
    pub check_policy: CheckPolicy,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            dict_max: DEFAULT_DICT_MAX,
            check_policy: CheckPolicy::default(),
        }
    }
}

impl DecoderConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dictionary limit.
    #[must_use]
    pub fn dict_max(mut self, bytes: usize) -> Self {
        self.dict_max = bytes;
        self
    }

    /// Set the reserved-check policy.
    #[must_use]
    pub fn check_policy(mut self, policy: CheckPolicy) -> Self {
        self.check_policy = policy;
        self
    }
}
