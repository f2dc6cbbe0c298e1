//! Decompress command implementation.

use crate::utils::{confirm_overwrite, create_progress_bar, format_size, output_path_for};
use filetime::FileTime;
use oxixz_stream::{DecoderConfig, XzError, XzReader, decompress_single_with};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Flags of the decompress command.
pub struct DecompressOptions {
    pub stdout: bool,
    pub keep: bool,
    pub force: bool,
    pub output: Option<PathBuf>,
    pub max_dict: usize,
    pub single_shot: bool,
    pub progress: bool,
}

pub fn cmd_decompress(
    files: &[PathBuf],
    opts: &DecompressOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if opts.output.is_some() && (files.len() > 1 || opts.stdout) {
        return Err("--output needs exactly one input and no --stdout".into());
    }

    let config = DecoderConfig::new().dict_max(opts.max_dict);

    for input in files {
        if opts.stdout {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            decode_file(input, &mut writer, config, opts)?;
            writer.flush()?;
            continue;
        }

        let dest = match &opts.output {
            Some(path) => path.clone(),
            None => output_path_for(input).ok_or_else(|| {
                format!("{}: unknown suffix, skipping", input.display())
            })?,
        };

        if dest.exists() && !opts.force && !confirm_overwrite(&dest)? {
            return Err(format!("{}: already exists", dest.display()).into());
        }

        let file = File::create(&dest)?;
        let mut writer = BufWriter::new(file);
        let written = match decode_file(input, &mut writer, config, opts) {
            Ok(n) => n,
            Err(e) => {
                drop(writer);
                // Best effort; the decode error is the one worth reporting.
                let _ = fs::remove_file(&dest);
                return Err(e);
            }
        };
        writer.flush()?;
        drop(writer);

        let metadata = fs::metadata(input)?;
        filetime::set_file_mtime(&dest, FileTime::from_last_modification_time(&metadata))?;

        tracing::info!(
            input = %input.display(),
            output = %dest.display(),
            size = %format_size(written),
            "decompressed"
        );

        if !opts.keep {
            fs::remove_file(input)?;
        }
    }

    Ok(())
}

/// Decode `input` into `writer` and return the number of bytes written.
fn decode_file<W: Write>(
    input: &Path,
    writer: &mut W,
    config: DecoderConfig,
    opts: &DecompressOptions,
) -> Result<u64, Box<dyn std::error::Error>> {
    if opts.single_shot {
        let data = fs::read(input)?;
        let out = decode_single_shot(&data, config)?;
        writer.write_all(&out)?;
        return Ok(out.len() as u64);
    }

    let file = File::open(input)?;
    let len = file.metadata()?.len();
    let pb = create_progress_bar(len, opts.progress);
    pb.set_message(input.display().to_string());

    let mut reader = XzReader::with_config(pb.wrap_read(file), config);
    let written = io::copy(&mut reader, writer).map_err(XzError::from_io)?;
    pb.finish_and_clear();

    tracing::debug!(streams = reader.streams().len(), "input complete");
    Ok(written)
}

/// Single-shot decoding needs the whole output up front; grow the buffer
/// until the stream fits.
fn decode_single_shot(data: &[u8], config: DecoderConfig) -> Result<Vec<u8>, XzError> {
    let mut out = vec![0u8; data.len().saturating_mul(4).max(4096)];
    loop {
        match decompress_single_with(data, &mut out, config) {
            Ok(n) => {
                out.truncate(n);
                return Ok(out);
            }
            Err(XzError::BufferTooSmall { available }) => {
                tracing::debug!(available, "single-shot buffer too small, doubling");
                let grown = available
                    .checked_mul(2)
                    .ok_or_else(|| XzError::out_of_memory(usize::MAX))?;
                out = vec![0u8; grown];
            }
            Err(e) => return Err(e),
        }
    }
}
