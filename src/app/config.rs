//! File configuration and its merge with CLI flags.
//!
//! The config file is a flat `key = value` list (TOML subset) at
//! `$XDG_CONFIG_HOME/surge/config.toml` or `$HOME/.config/surge/config.toml`.
//! Precedence is CLI flag, then config file, then built-in default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use surge_core::download::{CONNECT_TIMEOUT_SECS, DEFAULT_EVENT_BUFFER, PROGRESS_INTERVAL};

use crate::cli::GetArgs;

/// Default destination when neither `--path` nor `output_dir` is set.
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "downloads/";

/// Values read from the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
    pub event_buffer: Option<usize>,
    pub progress_interval_ms: Option<u64>,
    pub plain: Option<bool>,
}

impl FileConfig {
    /// Validates config values against the same limits as the CLI.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(secs) = self.connect_timeout_secs
            && !(1..=3600).contains(&secs)
        {
            bail!("Invalid config value for `connect_timeout_secs`: {secs}. Expected range: 1..=3600");
        }
        if let Some(buffer) = self.event_buffer
            && !(1..=4096).contains(&buffer)
        {
            bail!("Invalid config value for `event_buffer`: {buffer}. Expected range: 1..=4096");
        }
        if let Some(ms) = self.progress_interval_ms
            && !(10..=10_000).contains(&ms)
        {
            bail!("Invalid config value for `progress_interval_ms`: {ms}. Expected range: 10..=10000");
        }
        Ok(())
    }
}

/// Effective settings for one `get` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub destination: PathBuf,
    pub connect_timeout_secs: u64,
    pub event_buffer: usize,
    pub progress_interval: Duration,
    pub plain: bool,
}

impl Settings {
    /// Merges CLI flags over file values over defaults.
    pub(crate) fn resolve(args: &GetArgs, file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();
        Self {
            destination: args
                .path
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            connect_timeout_secs: args
                .connect_timeout
                .or(file.connect_timeout_secs)
                .unwrap_or(CONNECT_TIMEOUT_SECS),
            event_buffer: file.event_buffer.unwrap_or(DEFAULT_EVENT_BUFFER),
            progress_interval: file
                .progress_interval_ms
                .map_or(PROGRESS_INTERVAL, Duration::from_millis),
            plain: args.plain || file.plain.unwrap_or(false),
        }
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/surge/config.toml`
/// 2. `$HOME/.config/surge/config.toml`
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join("surge").join("config.toml"));
    }
    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("surge")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file from the default path, if one exists.
pub(crate) fn load_default_file_config() -> Result<Option<FileConfig>> {
    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };
        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_no}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "connect_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `connect_timeout_secs` value on line {line_no}")
                })?;
                cfg.connect_timeout_secs = Some(parsed);
            }
            "event_buffer" => {
                let parsed = parse_integer_u64(value)
                    .with_context(|| format!("Invalid `event_buffer` value on line {line_no}"))?;
                let n = usize::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("event_buffer out of range for usize"))?;
                cfg.event_buffer = Some(n);
            }
            "progress_interval_ms" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `progress_interval_ms` value on line {line_no}")
                })?;
                cfg.progress_interval_ms = Some(parsed);
            }
            "plain" => {
                let parsed = parse_boolean(value)
                    .with_context(|| format!("Invalid `plain` value on line {line_no}"))?;
                cfg.plain = Some(parsed);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_args(path: Option<&str>, timeout: Option<u64>, plain: bool) -> GetArgs {
        GetArgs {
            urls: vec!["https://example.com/a.bin".to_string()],
            path: path.map(PathBuf::from),
            concurrent: 1,
            md5: None,
            sha256: None,
            plain,
            json: false,
            connect_timeout: timeout,
        }
    }

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
output_dir = "/srv/files/"
connect_timeout_secs = 10
event_buffer = 128
progress_interval_ms = 500
plain = true
"#,
        )
        .expect("full config should parse");
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/srv/files/")));
        assert_eq!(cfg.connect_timeout_secs, Some(10));
        assert_eq!(cfg.event_buffer, Some(128));
        assert_eq!(cfg.progress_interval_ms, Some(500));
        assert_eq!(cfg.plain, Some(true));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
# defaults for the lab mirror
output_dir = "out/#1" # hash inside quotes is kept
plain = false # bars please
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.output_dir, Some(PathBuf::from("out/#1")));
        assert_eq!(cfg.plain, Some(false));
    }

    #[test]
    fn test_parse_config_rejects_unknown_key() {
        let err = parse_config_str("concurrency = 4").expect_err("unknown key expected");
        assert!(err.to_string().contains("Unknown configuration key"));
    }

    #[test]
    fn test_parse_config_rejects_out_of_range_values() {
        let err = parse_config_str("connect_timeout_secs = 0").expect_err("range error expected");
        assert!(err.to_string().contains("connect_timeout_secs"));

        let err = parse_config_str("event_buffer = 0").expect_err("range error expected");
        assert!(err.to_string().contains("event_buffer"));

        let err = parse_config_str("progress_interval_ms = 5").expect_err("range error expected");
        assert!(err.to_string().contains("progress_interval_ms"));
    }

    #[test]
    fn test_parse_config_rejects_bad_syntax() {
        let err = parse_config_str("plain").expect_err("syntax error expected");
        assert!(err.to_string().contains("line 1"));

        let err = parse_config_str("output_dir = downloads").expect_err("quote error expected");
        assert!(err.to_string().contains("output_dir"));

        let err = parse_config_str("connect_timeout_secs = -3").expect_err("sign error expected");
        assert!(err.to_string().contains("connect_timeout_secs"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::resolve(&get_args(None, None, false), None);
        assert_eq!(settings.destination, PathBuf::from("downloads/"));
        assert_eq!(settings.connect_timeout_secs, CONNECT_TIMEOUT_SECS);
        assert_eq!(settings.event_buffer, DEFAULT_EVENT_BUFFER);
        assert_eq!(settings.progress_interval, PROGRESS_INTERVAL);
        assert!(!settings.plain);
    }

    #[test]
    fn test_settings_cli_overrides_file() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("from-file/")),
            connect_timeout_secs: Some(5),
            event_buffer: Some(8),
            progress_interval_ms: Some(1000),
            plain: Some(true),
        };
        let settings = Settings::resolve(&get_args(Some("cli/"), Some(9), false), Some(&file));
        assert_eq!(settings.destination, PathBuf::from("cli/"));
        assert_eq!(settings.connect_timeout_secs, 9);
        assert_eq!(settings.event_buffer, 8);
        assert_eq!(settings.progress_interval, Duration::from_secs(1));
        assert!(settings.plain);

        let settings = Settings::resolve(&get_args(None, None, false), Some(&file));
        assert_eq!(settings.destination, PathBuf::from("from-file/"));
        assert_eq!(settings.connect_timeout_secs, 5);
    }
}
