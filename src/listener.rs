use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::foundation::error::PackError;

/// Notifications emitted while a sequence is packed and encoded.
///
/// Implementations are shared across worker threads, so every method takes `&self`. The
/// scheduler serializes `on_progress` calls; no two progress reports ever run concurrently.
pub trait ToolListener: Send + Sync {
    /// Fraction of frames finished, in `[0.0, 1.0]`, non-decreasing.
    fn on_progress(&self, progress: f64);
    /// A non-fatal condition, e.g. a canvas larger than most hardware decoders accept.
    fn on_warning(&self, message: &str);
    /// The operation failed. Fires at most once per operation.
    fn on_error(&self, error: &PackError);
    /// All frames were packed into `output`.
    fn on_complete(&self, output: &Path);
}

/// Listener that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopListener;

impl ToolListener for NoopListener {
    fn on_progress(&self, _progress: f64) {}
    fn on_warning(&self, _message: &str) {}
    fn on_error(&self, _error: &PackError) {}
    fn on_complete(&self, _output: &Path) {}
}

/// Listener that forwards notifications to `tracing`.
///
/// Progress is rendered as an integer percentage capped at 99 so that 100% is only implied by
/// the completion message.
#[derive(Debug, Default)]
pub struct ConsoleListener {
    last_percent: Mutex<Option<u32>>,
}

impl ConsoleListener {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ToolListener for ConsoleListener {
    fn on_progress(&self, progress: f64) {
        let percent = ((progress.clamp(0.0, 1.0) * 100.0) as u32).min(99);
        let mut last = self
            .last_percent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last == Some(percent) {
            return;
        }
        *last = Some(percent);
        tracing::info!("progress: {percent}%");
    }

    fn on_warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn on_error(&self, error: &PackError) {
        tracing::error!("{error}");
    }

    fn on_complete(&self, output: &Path) {
        tracing::info!("complete: {}", output.display());
    }
}

/// One captured notification.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolEvent {
    Progress(f64),
    Warning(String),
    Error(String),
    Complete(PathBuf),
}

/// In-memory listener for tests and embedding: records every notification in arrival order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ToolEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events captured so far.
    pub fn events(&self) -> Vec<ToolEvent> {
        self.lock().clone()
    }

    pub fn progress(&self) -> Vec<f64> {
        self.filter(|e| match e {
            ToolEvent::Progress(p) => Some(*p),
            _ => None,
        })
    }

    pub fn warnings(&self) -> Vec<String> {
        self.filter(|e| match e {
            ToolEvent::Warning(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.filter(|e| match e {
            ToolEvent::Error(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn completions(&self) -> Vec<PathBuf> {
        self.filter(|e| match e {
            ToolEvent::Complete(p) => Some(p.clone()),
            _ => None,
        })
    }

    fn filter<T>(&self, f: impl Fn(&ToolEvent) -> Option<T>) -> Vec<T> {
        self.lock().iter().filter_map(f).collect()
    }

    fn push(&self, event: ToolEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ToolEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ToolListener for RecordingListener {
    fn on_progress(&self, progress: f64) {
        self.push(ToolEvent::Progress(progress));
    }

    fn on_warning(&self, message: &str) {
        self.push(ToolEvent::Warning(message.to_string()));
    }

    fn on_error(&self, error: &PackError) {
        self.push(ToolEvent::Error(error.to_string()));
    }

    fn on_complete(&self, output: &Path) {
        self.push(ToolEvent::Complete(output.to_path_buf()));
    }
}
