use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use surge_core::download::names_directory;
use surge_core::{
    DownloadId, DownloadRequest, DownloadRun, Downloader, EngineOptions, EventSink, ExpectedChecksum,
    HttpClient, JsonLinesRenderer, LifecycleEvent, TerminalRenderer, TextRenderer,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::config::{self, Settings};
use crate::app::exit_handler;
use crate::app::terminal::{self, DisplayMode};
use crate::cli::{Cli, Command, GetArgs};

pub(crate) async fn run_surge() -> Result<ProcessExit> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();
    match cli.command {
        Command::Get(args) => run_get(cli.verbose, cli.quiet, args).await,
    }
}

async fn run_get(verbose: u8, quiet: bool, args: GetArgs) -> Result<ProcessExit> {
    let file_config = config::load_default_file_config()?;
    let settings = Settings::resolve(&args, file_config.as_ref());

    let mode = terminal::select_display_mode(
        io::stderr().is_terminal(),
        quiet,
        terminal::is_dumb_terminal(),
        settings.plain,
        args.json,
    );
    terminal::init_tracing(
        terminal::default_log_level(verbose, quiet, mode),
        terminal::no_color_env_requested(),
    );
    debug!(?args, ?settings, ?mode, "CLI arguments parsed");

    if args.concurrent > 1 {
        warn!(
            concurrent = args.concurrent,
            "multi-connection downloads are not supported; using one connection per file"
        );
    }

    let checksums = expected_checksums(&args)?;
    prepare_destination(&settings.destination, args.urls.len())?;

    let requests: Vec<DownloadRequest> = args
        .urls
        .iter()
        .zip(1u64..)
        .map(|(url, id)| {
            checksums.iter().cloned().fold(
                DownloadRequest::new(DownloadId(id), url.as_str(), &settings.destination)
                    .with_verbose(verbose > 0),
                DownloadRequest::with_checksum,
            )
        })
        .collect();

    let client = HttpClient::with_connect_timeout(settings.connect_timeout_secs)
        .context("Failed to build HTTP client")?;
    let downloader = Downloader::new(client).with_options(EngineOptions {
        progress_interval: settings.progress_interval,
        ..EngineOptions::default()
    });

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling downloads");
            interrupt.cancel();
        }
    });

    info!(
        downloads = requests.len(),
        destination = %settings.destination.display(),
        "Surge starting"
    );
    let outcome = DownloadRun::new(downloader)
        .with_capacity(settings.event_buffer)
        .run(requests, &cancel, event_sink(mode))
        .await
        .context("Download task failed")?;

    for (id, result) in &outcome.results {
        match result {
            Ok(file) if mode != DisplayMode::Json => println!("{}", file.path.display()),
            Ok(_) => {}
            // Plain and JSON displays already carry the failure.
            Err(e) if matches!(mode, DisplayMode::Interactive | DisplayMode::Silent) => {
                eprintln!("Error: download {id} failed ({}): {e}", e.kind());
            }
            Err(_) => {}
        }
    }

    info!(
        completed = outcome.completed(),
        failed = outcome.failed(),
        "Download complete"
    );

    if cancel.is_cancelled() {
        warn!(completed = outcome.completed(), "Interrupted before all downloads finished");
        return Ok(ProcessExit::Failure);
    }
    Ok(exit_handler::determine_exit_outcome(
        outcome.completed(),
        outcome.failed(),
    ))
}

/// Drops every event; `--quiet` relies on the final summary alone.
struct Discard;

impl EventSink for Discard {
    fn handle(&mut self, _event: LifecycleEvent) {}
}

fn event_sink(mode: DisplayMode) -> Box<dyn EventSink> {
    match mode {
        DisplayMode::Interactive => Box::new(TerminalRenderer::new()),
        DisplayMode::Plain => Box::new(TextRenderer::new(io::stderr())),
        DisplayMode::Json => Box::new(JsonLinesRenderer::new(io::stdout())),
        DisplayMode::Silent => Box::new(Discard),
    }
}

/// Collects `--md5` / `--sha256`, MD5 first.
fn expected_checksums(args: &GetArgs) -> Result<Vec<ExpectedChecksum>> {
    let mut checksums = Vec::new();
    for (algorithm, digest) in [("md5", &args.md5), ("sha256", &args.sha256)] {
        if let Some(digest) = digest {
            checksums.push(ExpectedChecksum::new(algorithm, digest)?);
        }
    }
    if !checksums.is_empty() && args.urls.len() != 1 {
        bail!(
            "--md5/--sha256 apply to a single download, but {} URLs were given",
            args.urls.len()
        );
    }
    Ok(checksums)
}

/// Creates a missing directory destination and rejects ambiguous ones.
fn prepare_destination(destination: &Path, url_count: usize) -> Result<()> {
    let is_dir = destination.is_dir();
    if !is_dir && names_directory(destination) {
        fs::create_dir_all(destination).with_context(|| {
            format!("Failed to create output directory '{}'", destination.display())
        })?;
        info!(dir = %destination.display(), "Created output directory");
        return Ok(());
    }
    if !is_dir && url_count > 1 {
        bail!(
            "'{}' is not a directory; several URLs need a directory destination (add a trailing '/')",
            destination.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use surge_core::ChecksumAlgorithm;

    fn args(urls: &[&str], md5: Option<&str>, sha256: Option<&str>) -> GetArgs {
        GetArgs {
            urls: urls.iter().map(|u| (*u).to_string()).collect(),
            path: None,
            concurrent: 1,
            md5: md5.map(str::to_string),
            sha256: sha256.map(str::to_string),
            plain: false,
            json: false,
            connect_timeout: None,
        }
    }

    #[test]
    fn test_expected_checksums_md5_first() {
        let checksums = expected_checksums(&args(
            &["https://example.com/a"],
            Some("65A8E27D8879283831B664BD8B7F0AD4"),
            Some(&"d".repeat(64)),
        ))
        .unwrap();
        assert_eq!(checksums.len(), 2);
        assert_eq!(checksums[0].algorithm, ChecksumAlgorithm::Md5);
        assert_eq!(checksums[0].value, "65a8e27d8879283831b664bd8b7f0ad4");
        assert_eq!(checksums[1].algorithm, ChecksumAlgorithm::Sha256);
    }

    #[test]
    fn test_expected_checksums_rejects_multiple_urls() {
        let err = expected_checksums(&args(
            &["https://example.com/a", "https://example.com/b"],
            Some("65a8e27d8879283831b664bd8b7f0ad4"),
            None,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("single download"));
    }

    #[test]
    fn test_expected_checksums_rejects_malformed_digest() {
        assert!(expected_checksums(&args(&["https://example.com/a"], Some("xyz"), None)).is_err());
    }

    #[test]
    fn test_prepare_destination_creates_trailing_slash_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = PathBuf::from(format!("{}/nested/out/", dir.path().display()));
        prepare_destination(&target, 2).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_prepare_destination_rejects_file_for_many_urls() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("single.bin");
        assert!(prepare_destination(&target, 2).is_err());
        prepare_destination(&target, 1).unwrap();
        assert!(!target.exists());
    }
}
