//! Progress reporting.

use std::sync::Mutex;

use deepresearch_shared::{RunProgress, Stage};

/// Receives pipeline milestones.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &RunProgress);
}

/// No-op reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn report(&self, _progress: &RunProgress) {}
}

impl<F> ProgressReporter for F
where
    F: Fn(&RunProgress) + Send + Sync,
{
    fn report(&self, progress: &RunProgress) {
        self(progress)
    }
}

/// Wraps a reporter and keeps the percentage from ever going backwards.
pub struct ProgressTracker<'a> {
    inner: &'a dyn ProgressReporter,
    last: Mutex<u8>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(inner: &'a dyn ProgressReporter) -> Self {
        Self {
            inner,
            last: Mutex::new(0),
        }
    }

    /// Report a milestone. A percent below the previous one is raised to it.
    pub fn milestone(&self, percent: u8, stage: Stage, detail: impl Into<String>) {
        let percent = {
            let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
            *last = (*last).max(percent.min(100));
            *last
        };
        self.inner.report(&RunProgress::new(percent, stage, detail));
    }

    /// Report the terminal error milestone at the current percent.
    pub fn error(&self, message: impl Into<String>) {
        let percent = *self.last.lock().unwrap_or_else(|p| p.into_inner());
        self.inner
            .report(&RunProgress::new(percent, Stage::Error, message));
    }
}

/// Reporter that records every milestone.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<RunProgress>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<RunProgress> {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<RunProgress> {
        self.events().pop()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, progress: &RunProgress) {
        self.events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(progress.clone());
    }
}
