//! Event sinks that draw download progress.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use super::{CardState, DownloadCard, ProgressModel};
use crate::events::{DownloadId, EventSink, LifecycleEvent};

/// Redraw cadence for elapsed-time displays between events.
const TICK_INTERVAL: Duration = Duration::from_millis(200);

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} @ {bytes_per_sec} {elapsed} - {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("━━╌")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {bytes} @ {bytes_per_sec} {elapsed} - {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn card_label(card: &DownloadCard) -> String {
    url::Url::parse(&card.url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
                .filter(|s| !s.is_empty())
                .or_else(|| u.host_str().map(str::to_string))
        })
        .unwrap_or_else(|| card.id.to_string())
}

/// Interactive renderer: one indicatif bar per download.
#[derive(Debug)]
pub struct TerminalRenderer {
    model: ProgressModel,
    progress: MultiProgress,
    bars: HashMap<DownloadId, ProgressBar>,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalRenderer {
    /// Draws to stderr.
    #[must_use]
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    #[must_use]
    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        Self {
            model: ProgressModel::new(),
            progress: MultiProgress::with_draw_target(target),
            bars: HashMap::new(),
        }
    }

    #[must_use]
    pub fn model(&self) -> &ProgressModel {
        &self.model
    }

    fn bar_for(&mut self, card: &DownloadCard) -> ProgressBar {
        self.bars
            .entry(card.id)
            .or_insert_with(|| {
                let bar = self.progress.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style());
                bar
            })
            .clone()
    }
}

impl EventSink for TerminalRenderer {
    fn register(&mut self, id: DownloadId, url: &str) {
        self.model.register(id, url);
        if let Some(card) = self.model.card(id).cloned() {
            let bar = self.bar_for(&card);
            bar.set_message(format!("{} (pending)", card_label(&card)));
        }
    }

    fn handle(&mut self, event: LifecycleEvent) {
        let Some(card) = self.model.apply(&event).cloned() else {
            return;
        };
        let bar = self.bar_for(&card);
        let label = card_label(&card);
        match card.state {
            CardState::Pending => {}
            CardState::Downloading => {
                if let Some(total) = card.total_bytes {
                    if bar.length() != Some(total) {
                        bar.set_style(bar_style());
                        bar.set_length(total);
                    }
                }
                bar.set_position(card.bytes_written);
                bar.set_message(label);
                bar.enable_steady_tick(TICK_INTERVAL);
            }
            CardState::Completed => {
                bar.set_position(card.bytes_written);
                let shown = card
                    .path
                    .as_ref()
                    .map_or(label, |p| p.display().to_string());
                bar.finish_with_message(format!("done {shown}"));
            }
            CardState::Failed => {
                let error = card.error.unwrap_or_default();
                bar.abandon_with_message(format!("{label} failed: {error}"));
            }
        }
    }

    fn finish(&mut self) {
        for bar in self.bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}

/// Non-interactive renderer: progress lines rewritten in place with `\r`.
#[derive(Debug)]
pub struct TextRenderer<W> {
    model: ProgressModel,
    out: W,
    line_open: bool,
}

impl<W: Write + Send> TextRenderer<W> {
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            model: ProgressModel::new(),
            out,
            line_open: false,
        }
    }

    #[must_use]
    pub fn model(&self) -> &ProgressModel {
        &self.model
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_card(&mut self, card: &DownloadCard) -> std::io::Result<()> {
        let prefix = if self.model.len() > 1 {
            format!("[{}] ", card.id)
        } else {
            String::new()
        };
        match card.state {
            CardState::Pending => {}
            CardState::Downloading => {
                if card.elapsed > Duration::ZERO || card.bytes_written > 0 {
                    write!(self.out, "\r{prefix}{}", card.progress_line())?;
                    self.line_open = true;
                }
            }
            CardState::Completed => {
                if self.line_open {
                    writeln!(self.out)?;
                    self.line_open = false;
                }
            }
            CardState::Failed => {
                if self.line_open {
                    writeln!(self.out)?;
                    self.line_open = false;
                }
                writeln!(
                    self.out,
                    "{prefix}failed: {}",
                    card.error.as_deref().unwrap_or("unknown error")
                )?;
            }
        }
        self.out.flush()
    }
}

impl<W: Write + Send> EventSink for TextRenderer<W> {
    fn register(&mut self, id: DownloadId, url: &str) {
        self.model.register(id, url);
    }

    fn handle(&mut self, event: LifecycleEvent) {
        let Some(card) = self.model.apply(&event).cloned() else {
            return;
        };
        if let Err(e) = self.write_card(&card) {
            debug!(error = %e, "failed to write progress line");
        }
    }

    fn finish(&mut self) {
        if self.line_open {
            let _ = writeln!(self.out);
            self.line_open = false;
        }
        let _ = self.out.flush();
    }
}

/// Machine-readable renderer: one JSON object per event.
#[derive(Debug)]
pub struct JsonLinesRenderer<W> {
    out: W,
}

impl<W: Write + Send> JsonLinesRenderer<W> {
    #[must_use]
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> EventSink for JsonLinesRenderer<W> {
    fn handle(&mut self, event: LifecycleEvent) {
        let written = serde_json::to_writer(&mut self.out, &event)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.out))
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            debug!(error = %e, "failed to write event line");
        }
    }
}
