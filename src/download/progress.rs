//! Byte progress for one download, drawn with indicatif on stderr.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::mmsh::ProgressSnapshot;

pub(crate) struct ProgressReporter {
    pub(crate) snapshot: ProgressSnapshot,
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub(crate) fn new(label: &str, enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            bar.set_style(unknown_total_style());
            bar.set_prefix(label.to_string());
            bar
        });
        Self {
            snapshot: ProgressSnapshot::default(),
            bar,
        }
    }

    pub(crate) fn update(&mut self, snapshot: ProgressSnapshot) {
        let total_changed = snapshot.expected != self.snapshot.expected;
        self.snapshot = snapshot;
        let Some(bar) = self.bar.as_ref() else {
            return;
        };
        if total_changed {
            match snapshot.expected {
                Some(total) => {
                    bar.set_style(known_total_style());
                    bar.set_length(total);
                }
                None => bar.set_style(unknown_total_style()),
            }
        }
        bar.set_position(snapshot.written);
    }

    /// Percentage of the expected size, when known.
    pub(crate) fn percent(&self) -> Option<f64> {
        let total = self.snapshot.expected.filter(|&t| t > 0)?;
        Some(100.0 * self.snapshot.written as f64 / total as f64)
    }

    pub(crate) fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}

fn known_total_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix} [{elapsed_precise}] {wide_bar} {bytes}/{total_bytes} ({percent}%, ETA {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("##-")
}

fn unknown_total_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} [{elapsed_precise}] {spinner} {bytes} ({bytes_per_sec})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
