use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

use vkloader_core::progress::{format_bytes, RunObserver, RunSnapshot};
use vkloader_core::{ItemOutcome, ItemReport};

/// Renders a run as one indicatif bar, printing each finished file name above it.
pub struct TerminalProgressObserver {
    /// Created once the catalog size is known.
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalProgressObserver {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

/// The line printed for every attempted track.
pub fn completion_line(report: &ItemReport) -> String {
    match &report.outcome {
        ItemOutcome::Downloaded { .. } | ItemOutcome::Skipped => report.file_name.clone(),
        ItemOutcome::Failed { error } => format!("{} (failed: {})", report.file_name, error),
    }
}

#[async_trait]
impl RunObserver for TerminalProgressObserver {
    async fn on_catalog(&self, total: usize) {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "[{bar:30.cyan/blue}] {pos}/{len} tracks ({elapsed}) {msg}",
        ) {
            pb.set_style(style.progress_chars("=>-"));
        }
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(pb);
        }
    }

    async fn on_item(&self, report: &ItemReport, snapshot: &RunSnapshot) {
        let line = completion_line(report);
        self.with_bar(|pb| {
            // suspend() still prints when the bar is hidden (stdout piped).
            pb.suspend(|| println!("{}", line));
            pb.set_position(snapshot.attempted as u64);
            pb.set_message(format_bytes(snapshot.bytes_written));
        });
    }

    async fn on_finish(&self, snapshot: &RunSnapshot) {
        self.with_bar(|pb| {
            pb.finish_with_message(format!(
                "{} downloaded, {} skipped, {} failed ({})",
                snapshot.downloaded,
                snapshot.skipped,
                snapshot.failed,
                format_bytes(snapshot.bytes_written)
            ));
        });
    }
}
