//! OxiXZ CLI - a Pure Rust `.xz` decompressor
//!
//! Decompresses, tests, and inspects `.xz` files.

mod commands;
mod utils;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use commands::{DecompressOptions, cmd_decompress, cmd_info, cmd_test};
use oxixz_stream::DEFAULT_DICT_MAX;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oxixz")]
#[command(author, version, about = "Pure Rust .xz decompressor")]
#[command(long_about = "
OxiXZ decodes .xz files: LZMA2 data in the XZ container, with CRC32,
CRC64 and SHA-256 integrity checks and concatenated streams.

Examples:
  oxixz decompress data.xz
  oxixz decompress -c data.xz > data
  oxixz decompress -k -o out.bin data.xz
  oxixz test *.xz
  oxixz info --json data.xz
")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompress .xz files
    #[command(alias = "d")]
    Decompress {
        /// Files to decompress
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write to standard output
        #[arg(short = 'c', long)]
        stdout: bool,

        /// Keep input files
        #[arg(short, long)]
        keep: bool,

        /// Overwrite existing output files without asking
        #[arg(short, long)]
        force: bool,

        /// Output file (only with a single input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Largest dictionary to accept (e.g. 64MiB, 8M, 1048576)
        #[arg(long, value_parser = utils::parse_size, default_value_t = DEFAULT_DICT_MAX)]
        max_dict: usize,

        /// Decode each file in one call straight into the output buffer
        #[arg(long)]
        single_shot: bool,

        /// Show a progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Test file integrity
    #[command(alias = "t")]
    Test {
        /// Files to test
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Largest dictionary to accept
        #[arg(long, value_parser = utils::parse_size, default_value_t = DEFAULT_DICT_MAX)]
        max_dict: usize,
    },

    /// Show streams, blocks, and checks of a file
    #[command(alias = "i")]
    Info {
        /// File to inspect
        file: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Decompress {
            files,
            stdout,
            keep,
            force,
            output,
            max_dict,
            single_shot,
            progress,
        } => cmd_decompress(
            &files,
            &DecompressOptions {
                stdout,
                keep,
                force,
                output,
                max_dict,
                single_shot,
                progress,
            },
        ),
        Commands::Test { files, max_dict } => cmd_test(&files, max_dict),
        Commands::Info { file, json } => cmd_info(&file, json, cli.verbose > 0),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "oxixz", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
