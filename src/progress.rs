//! Terminal feedback for the scan and resolve phases.
//!
//! A run either draws indicatif bars, or (with `--log-only`) hides them and
//! emits a `tracing` line every few files so the output stays tail-friendly.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})";
const SPINNER_TEMPLATE: &str = "{msg} {spinner} [{elapsed_precise}]";

/// How progress is reported for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressMode {
    log_only: bool,
}

impl ProgressMode {
    pub fn new(log_only: bool) -> Self {
        Self { log_only }
    }

    pub fn log_only(&self) -> bool {
        self.log_only
    }

    /// Bar over `len` items, labelled with `phase`.
    pub fn bar(&self, len: u64, phase: &str) -> ProgressBar {
        let pb = self.styled(ProgressBar::new(len), || {
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .map(|s| s.progress_chars("=> "))
        });
        pb.set_message(phase.to_string());
        pb
    }

    /// Ticking spinner for work of unknown length.
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.styled(ProgressBar::new_spinner(), || {
            ProgressStyle::default_spinner().template(SPINNER_TEMPLATE)
        });
        if !self.log_only {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Log a progress line when `done` lands on a checkpoint. No-op unless log-only.
    pub fn checkpoint(&self, phase: &str, done: u64, total: u64, every: u64) {
        if self.log_only && is_checkpoint(done, total, every) {
            let pct = 100.0 * done as f64 / total as f64;
            tracing::info!("[{}] {}/{} ({:.1}%)", phase, done, total, pct);
        }
    }

    fn styled<E>(
        &self,
        pb: ProgressBar,
        style: impl FnOnce() -> Result<ProgressStyle, E>,
    ) -> ProgressBar {
        if self.log_only {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        } else if let Ok(style) = style() {
            pb.set_style(style);
        }
        pb
    }
}

/// Every `every`-th item and the last one are checkpoints.
fn is_checkpoint(done: u64, total: u64, every: u64) -> bool {
    total > 0 && every > 0 && done > 0 && (done % every == 0 || done == total)
}

/// Seconds below a minute, minutes and seconds above.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let whole = d.as_secs();
        format!("{}m{:02}s", whole / 60, whole % 60)
    }
}
