mod decode;
mod info;
mod render;

use std::io::{stderr, stdin, BufReader};
use std::path::{Path, PathBuf};
use std::{fs::File, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sytc::{spawn_reader, ByteSource, FrameDecoder, ReaderSource, TerminatorPolicy};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode frames from a captured SYTC byte stream.
    ///
    /// Bytes that are not part of a frame are skipped. Frames that fail to decode are
    /// logged and decoding resumes at the next sync marker.
    Decode {
        /// Input capture file, or - for stdin.
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: render::Format,

        /// Time allowed for each frame, in milliseconds.
        #[arg(short, long, default_value_t = 1000, value_name = "ms")]
        timeout: u64,

        /// Drop frames whose terminator is not 0xEE 0xEE rather than flagging them.
        #[arg(long, action)]
        strict: bool,
    },
    /// Show information about a captured SYTC byte stream.
    Info {
        /// Input capture file, or - for stdin.
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: render::Format,

        /// Time allowed for each frame, in milliseconds.
        #[arg(short, long, default_value_t = 1000, value_name = "ms")]
        timeout: u64,
    },
}

/// Size of reads made by the stdin pump thread.
const STDIN_CHUNK: usize = 512;

fn open_source(input: &Path) -> Result<Box<dyn ByteSource + Send>> {
    if input.as_os_str() == "-" {
        debug!("reading from stdin");
        let source = spawn_reader(stdin(), STDIN_CHUNK).context("starting stdin reader")?;
        return Ok(Box::new(source));
    }
    let file = File::open(input).with_context(|| format!("opening input {input:?}"))?;
    Ok(Box::new(ReaderSource::new(BufReader::new(file))))
}

fn new_decoder(timeout: u64, strict: bool) -> FrameDecoder {
    FrameDecoder::builder()
        .timeout(Duration::from_millis(timeout))
        .terminator_policy(if strict {
            TerminatorPolicy::Reject
        } else {
            TerminatorPolicy::Flag
        })
        .build()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("SYTC_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Decode {
            input,
            format,
            timeout,
            strict,
        } => {
            let source = open_source(input)?;
            decode::decode(source, new_decoder(*timeout, *strict), format)
        }
        Commands::Info {
            input,
            format,
            timeout,
        } => {
            let source = open_source(input)?;
            info::info(
                &input.to_string_lossy(),
                source,
                new_decoder(*timeout, false),
                format,
            )
        }
    }
}
