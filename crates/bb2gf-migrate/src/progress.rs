//! Per-project progress: a phase tracker with an optional callback, and an
//! `indicatif` bar that consumes it.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Receives every [`ProgressUpdate`].
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Snapshot sent to the callback on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub phase: MigrationPhase,
    /// Repository the phase applies to, if any.
    pub repo: Option<String>,
    pub done: u64,
    pub total: u64,
}

/// Phases of one repository's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MigrationPhase {
    /// Listing source repositories.
    Listing,
    /// Applying filters and resolving URLs.
    Preparing,
    /// Creating the destination project.
    CreatingProject,
    /// Mirror clone from the source.
    Cloning,
    /// Fetching large-file objects.
    FetchingLfs,
    /// Mirror push to the destination.
    Pushing,
    /// Pushing large-file objects.
    PushingLfs,
    /// Removing the local mirror.
    CleaningUp,
    /// Every repository processed.
    Complete,
}

impl MigrationPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Listing,
            1 => Self::Preparing,
            2 => Self::CreatingProject,
            3 => Self::Cloning,
            4 => Self::FetchingLfs,
            5 => Self::Pushing,
            6 => Self::PushingLfs,
            7 => Self::CleaningUp,
            _ => Self::Complete,
        }
    }
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listing => write!(f, "listing repositories"),
            Self::Preparing => write!(f, "preparing"),
            Self::CreatingProject => write!(f, "creating project"),
            Self::Cloning => write!(f, "cloning"),
            Self::FetchingLfs => write!(f, "fetching LFS"),
            Self::Pushing => write!(f, "pushing"),
            Self::PushingLfs => write!(f, "pushing LFS"),
            Self::CleaningUp => write!(f, "cleaning up"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Tracks one project: which phase the current repository is in and how
/// many repositories are done.
pub struct MigrationProgress {
    phase: AtomicU8,
    done: AtomicU64,
    total: AtomicU64,
    callback: Option<ProgressCallback>,
}

impl MigrationProgress {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(MigrationPhase::Listing as u8),
            done: AtomicU64::new(0),
            total: AtomicU64::new(0),
            callback: None,
        }
    }

    /// A tracker reporting to `callback`.
    pub fn with_callback(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            ..Self::new()
        }
    }

    /// Reset for a project of `total` repositories.
    pub fn begin(&self, total: u64) {
        self.phase.store(MigrationPhase::Preparing as u8, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
        self.publish(None);
    }

    /// Enter `phase` for `repo`.
    pub fn set_phase(&self, phase: MigrationPhase, repo: &str) {
        self.phase.store(phase as u8, Ordering::Relaxed);
        self.publish(Some(repo));
    }

    /// Count `repo` as done.
    pub fn increment(&self, repo: &str) {
        self.done.fetch_add(1, Ordering::Relaxed);
        self.publish(Some(repo));
    }

    pub fn finish(&self) {
        self.phase.store(MigrationPhase::Complete as u8, Ordering::Relaxed);
        self.publish(None);
    }

    /// Current state.
    pub fn snapshot(&self) -> ProgressUpdate {
        ProgressUpdate {
            phase: MigrationPhase::from_u8(self.phase.load(Ordering::Relaxed)),
            repo: None,
            done: self.done.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }

    fn publish(&self, repo: Option<&str>) {
        let Some(callback) = &self.callback else {
            return;
        };
        callback(ProgressUpdate {
            repo: repo.map(str::to_string),
            ..self.snapshot()
        });
    }
}

impl Default for MigrationProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// `indicatif` bar advancing once per repository of a project.
pub struct ConsoleProgressReporter {
    bar: ProgressBar,
}

impl ConsoleProgressReporter {
    /// A bar on stderr labelled with `project_key`.
    pub fn new(project_key: &str) -> Self {
        let style = ProgressStyle::with_template(
            "{spinner:.green} {prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        let bar = ProgressBar::new(0).with_style(style);
        bar.set_prefix(project_key.to_string());
        Self { bar }
    }

    /// A bar that never draws, for JSON logs and tests.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Callback driving this bar.
    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Box::new(move |update| {
            bar.set_length(update.total);
            bar.set_position(update.done);
            bar.set_message(match update.repo {
                Some(repo) => format!("{repo}: {}", update.phase),
                None => update.phase.to_string(),
            });
        })
    }

    /// Run `f` with the bar cleared.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}
