//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Maximum value accepted by `--concurrent`.
pub const MAX_CONCURRENT: u8 = 32;

/// Fetch files over HTTP(S) with live progress.
///
/// Each file is streamed into a hidden staging file next to its destination
/// and moved into place only once it is complete.
#[derive(Parser, Debug)]
#[command(name = "surge")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download one or more URLs
    Get(GetArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// URLs to download (http:// or https://)
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Destination file or directory (a trailing `/` always means a directory)
    #[arg(short, long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Concurrent connections per download (reserved; single stream today)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=i64::from(MAX_CONCURRENT)))]
    pub concurrent: u8,

    /// Expected MD5 digest (hex); only with a single URL
    #[arg(long, value_name = "HEX")]
    pub md5: Option<String>,

    /// Expected SHA-256 digest (hex); only with a single URL
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Plain text progress on stderr instead of progress bars
    #[arg(long, conflicts_with = "json")]
    pub plain: bool,

    /// Emit lifecycle events as JSON lines on stdout
    #[arg(long)]
    pub json: bool,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,
}
