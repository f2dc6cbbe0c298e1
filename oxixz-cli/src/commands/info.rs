//! Info command implementation.

use crate::utils::{format_size, ratio, scan};
use oxixz_stream::filter::filter_name;
use oxixz_stream::{DecoderConfig, StreamStats};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InfoOutput<'a> {
    file: String,
    compressed_size: u64,
    uncompressed_size: u64,
    ratio: f64,
    streams: &'a [StreamStats],
}

pub fn cmd_info(
    file: &PathBuf,
    json: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let scan = scan(file, DecoderConfig::default())?;

    if json {
        let output = InfoOutput {
            file: file.display().to_string(),
            compressed_size: scan.compressed,
            uncompressed_size: scan.uncompressed,
            ratio: ratio(scan.compressed, scan.uncompressed),
            streams: &scan.streams,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_summary(file, scan.compressed, scan.uncompressed, &scan.streams);
    if verbose {
        print_blocks(&scan.streams);
    }
    Ok(())
}

fn print_summary(file: &Path, compressed: u64, uncompressed: u64, streams: &[StreamStats]) {
    let blocks: usize = streams.iter().map(|s| s.blocks.len()).sum();
    let checks: Vec<String> = streams
        .iter()
        .filter_map(|s| s.check)
        .map(|c| c.to_string())
        .collect();
    let dict = streams.iter().map(StreamStats::max_dict_size).max().unwrap_or(0);

    println!("File Information");
    println!("================");
    println!("File: {}", file.display());
    println!("Streams: {}", streams.len());
    println!("Blocks: {}", blocks);
    println!("Compressed size: {}", format_size(compressed));
    println!("Uncompressed size: {}", format_size(uncompressed));
    println!("Ratio: {:.3}", ratio(compressed, uncompressed));
    println!("Check: {}", checks.join(", "));
    println!("Largest dictionary: {}", format_size(dict as u64));
}

fn print_blocks(streams: &[StreamStats]) {
    println!();
    println!(
        "{:>6} {:>6} {:>12} {:>12} {:>10}  Filters",
        "Stream", "Block", "Unpadded", "Uncomp", "Dict"
    );
    println!("{}", "-".repeat(64));

    for (s, stream) in streams.iter().enumerate() {
        for (b, block) in stream.blocks.iter().enumerate() {
            let filters = match block.filter.and_then(filter_name) {
                Some(name) => format!("{name},lzma2"),
                None => "lzma2".to_string(),
            };
            println!(
                "{:>6} {:>6} {:>12} {:>12} {:>10}  {}",
                s + 1,
                b + 1,
                block.unpadded_size,
                block.uncompressed_size,
                format_size(block.dict_size as u64),
                filters
            );
        }
    }
}
