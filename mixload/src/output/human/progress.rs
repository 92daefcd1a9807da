use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// One bar for the whole run: a bar when the run has a known length, a spinner otherwise.
pub(crate) struct HumanProgress {
    inner: Mutex<Option<Bar>>,
}

struct Bar {
    kind: ProgressBarKind,
    pb: ProgressBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgressBarKind {
    Spinner,
    Bar,
}

/// How far along the run is, in the bar's own units.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Position {
    Elapsed { elapsed: Duration, total: Duration },
    Count { done: u64, total: u64 },
    Unknown,
}

impl HumanProgress {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    pub(crate) fn update(&self, position: Position, message: String) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let desired_kind = match position {
            Position::Unknown => ProgressBarKind::Spinner,
            Position::Elapsed { .. } | Position::Count { .. } => ProgressBarKind::Bar,
        };

        if inner.as_ref().is_some_and(|b| b.kind != desired_kind)
            && let Some(old) = inner.take()
        {
            old.pb.finish_and_clear();
        }

        let bar = inner.get_or_insert_with(|| new_bar(desired_kind));
        bar.pb.set_message(message);

        match position {
            Position::Elapsed { elapsed, total } => {
                let total_ms = total.as_millis() as u64;
                bar.pb.set_length(total_ms);
                bar.pb.set_position((elapsed.as_millis() as u64).min(total_ms));
            }
            Position::Count { done, total } => {
                bar.pb.set_length(total);
                bar.pb.set_position(done.min(total));
            }
            Position::Unknown => bar.pb.tick(),
        }
    }

    pub(crate) fn finish(&self) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(bar) = inner.take() {
            bar.pb.finish_and_clear();
        }
    }
}

fn new_bar(kind: ProgressBarKind) -> Bar {
    let pb = match kind {
        ProgressBarKind::Bar => {
            let pb = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr_with_hz(5));
            pb.set_style(bar_style());
            pb
        }
        ProgressBarKind::Spinner => {
            let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(5));
            pb.set_style(spinner_style());
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        }
    };
    pb.set_prefix("combined");
    Bar { kind, pb }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} [ {bar:20.cyan/blue} ] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} {spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
