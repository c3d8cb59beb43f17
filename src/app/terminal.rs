//! Terminal detection and tracing setup.

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

/// How lifecycle events are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DisplayMode {
    /// indicatif bars on stderr.
    Interactive,
    /// `\r`-refreshed text lines on stderr.
    Plain,
    /// JSON lines on stdout.
    Json,
    /// Nothing but the final summary.
    Silent,
}

pub(crate) fn select_display_mode(
    stderr_is_terminal: bool,
    quiet: bool,
    dumb_terminal: bool,
    plain: bool,
    json: bool,
) -> DisplayMode {
    if json {
        DisplayMode::Json
    } else if quiet {
        DisplayMode::Silent
    } else if plain || !stderr_is_terminal || dumb_terminal {
        DisplayMode::Plain
    } else {
        DisplayMode::Interactive
    }
}

/// Default log level when `RUST_LOG` is unset.
///
/// Interactive bars keep logs at `warn` so log lines do not tear the display.
pub(crate) fn default_log_level(verbose: u8, quiet: bool, mode: DisplayMode) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 if mode == DisplayMode::Interactive => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

pub(crate) fn init_tracing(default_level: &str, no_color: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mode_selection() {
        assert_eq!(
            select_display_mode(true, false, false, false, false),
            DisplayMode::Interactive
        );
        assert_eq!(
            select_display_mode(false, false, false, false, false),
            DisplayMode::Plain
        );
        assert_eq!(
            select_display_mode(true, false, true, false, false),
            DisplayMode::Plain
        );
        assert_eq!(
            select_display_mode(true, false, false, true, false),
            DisplayMode::Plain
        );
        assert_eq!(
            select_display_mode(true, true, false, false, false),
            DisplayMode::Silent
        );
        assert_eq!(
            select_display_mode(true, true, false, false, true),
            DisplayMode::Json
        );
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(0, false, DisplayMode::Interactive), "warn");
        assert_eq!(default_log_level(0, false, DisplayMode::Plain), "info");
        assert_eq!(default_log_level(1, false, DisplayMode::Interactive), "debug");
        assert_eq!(default_log_level(3, false, DisplayMode::Json), "trace");
        assert_eq!(default_log_level(2, true, DisplayMode::Silent), "error");
    }
}
