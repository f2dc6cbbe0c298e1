//! Utility functions for the CLI.

use indicatif::{ProgressBar, ProgressStyle};
use oxixz_stream::{DecoderConfig, StreamStats, XzError, XzReader};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

/// Create a byte-count progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .expect("progress bar template is valid")
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// Parse a size such as `1048576`, `64K`, `8MiB` or `1G` (binary units).
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);

    let value: usize = digits
        .parse()
        .map_err(|_| format!("invalid size '{s}'"))?;
    let shift = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 10,
        "m" | "mb" | "mib" => 20,
        "g" | "gb" | "gib" => 30,
        _ => return Err(format!("unknown size unit '{unit}'")),
    };

    value
        .checked_mul(1 << shift)
        .ok_or_else(|| format!("size '{s}' is too large"))
}

/// Output path for a compressed file: `x.xz` becomes `x`, `x.txz` becomes
/// `x.tar`.
pub fn output_path_for(input: &Path) -> Option<PathBuf> {
    let ext = input.extension()?.to_str()?;
    match ext.to_ascii_lowercase().as_str() {
        "xz" => Some(input.with_extension("")),
        "txz" => Some(input.with_extension("tar")),
        _ => None,
    }
}

/// Ask before replacing `path`. Without a terminal the answer is no.
pub fn confirm_overwrite(path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }
    let answer = dialoguer::Confirm::new()
        .with_prompt(format!("{} already exists. Overwrite?", path.display()))
        .default(false)
        .interact()?;
    Ok(answer)
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Compressed size as a fraction of the uncompressed size.
pub fn ratio(compressed: u64, uncompressed: u64) -> f64 {
    if uncompressed == 0 {
        0.0
    } else {
        compressed as f64 / uncompressed as f64
    }
}

/// Result of decoding a whole file without keeping its contents.
pub struct Scan {
    /// File size.
    pub compressed: u64,
    /// Decoded size.
    pub uncompressed: u64,
    /// Every stream in the file.
    pub streams: Vec<StreamStats>,
}

/// Decode `path` into a sink, verifying every check along the way.
pub fn scan(path: &Path, config: DecoderConfig) -> Result<Scan, XzError> {
    let file = File::open(path)?;
    let compressed = file.metadata()?.len();

    let mut reader = XzReader::with_config(file, config);
    let uncompressed = io::copy(&mut reader, &mut io::sink()).map_err(XzError::from_io)?;

    Ok(Scan {
        compressed,
        uncompressed,
        streams: reader.streams().to_vec(),
    })
}
