//! Test command implementation.

use crate::utils::{Scan, format_size, scan};
use oxixz_stream::{DecoderConfig, XzError};
use rayon::prelude::*;
use std::path::PathBuf;

pub fn cmd_test(files: &[PathBuf], max_dict: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = DecoderConfig::new().dict_max(max_dict);

    // Files are independent, so each gets its own decoder on the pool.
    let results: Vec<(&PathBuf, Result<Scan, XzError>)> = files
        .par_iter()
        .map(|path| (path, scan(path, config)))
        .collect();

    let mut errors: Vec<(String, String)> = Vec::new();
    for (path, result) in &results {
        match result {
            Ok(scan) => {
                println!(
                    "  OK: {} ({} -> {})",
                    path.display(),
                    format_size(scan.compressed),
                    format_size(scan.uncompressed)
                );
            }
            Err(e) => {
                println!("  FAILED: {} - {}", path.display(), e);
                errors.push((path.display().to_string(), e.to_string()));
            }
        }
    }

    println!();
    println!("Test results:");
    println!("  Total files: {}", results.len());
    println!("  OK: {}", results.len() - errors.len());
    println!("  Failed: {}", errors.len());

    if !errors.is_empty() {
        std::process::exit(2);
    }

    println!();
    println!("All files OK");
    Ok(())
}
