//! Progress reporting for harvest runs.
//!
//! The coordinator only emits [`ProgressEvent`]s; how they are shown is up to
//! the observer.

use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        title: String,
        total: usize,
    },
    /// One unit of work reached a terminal state. Arrives in completion
    /// order, not link order.
    Completed {
        link: String,
        completed: usize,
        total: usize,
        failed: usize,
        error: Option<String>,
    },
    Finished {
        succeeded: usize,
        failed: usize,
    },
}

pub trait ProgressObserver: Send + Sync {
    fn event(&self, event: ProgressEvent);
}

/// Observer for `--quiet` runs.
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn event(&self, _event: ProgressEvent) {}
}

/// Terminal progress bar showing completed / total.
pub struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { title, total } => {
                self.bar.set_length(total as u64);
                self.bar.set_message(format!("Harvesting {title}"));
            }
            ProgressEvent::Completed {
                completed, failed, ..
            } => {
                self.bar.set_position(completed as u64);
                if failed > 0 {
                    self.bar.set_message(format!("{failed} failed"));
                }
            }
            ProgressEvent::Finished { succeeded, failed } => {
                self.bar
                    .finish_with_message(format!("{succeeded} harvested, {failed} failed"));
            }
        }
    }
}
