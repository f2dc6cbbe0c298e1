//! Command implementations for OxiXZ CLI.

pub mod decompress;
pub mod info;
pub mod test;

pub use decompress::{DecompressOptions, cmd_decompress};
pub use info::cmd_info;
pub use test::cmd_test;
