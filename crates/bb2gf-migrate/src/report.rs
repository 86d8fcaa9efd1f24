//! Run aggregation and JSON reports.
//!
//! Repository steps only produce [`MigrationRecord`]s. A [`ProjectSummary`]
//! folds them for one source project and the [`RunAggregator`], owned by the
//! run driver, collects the summaries into a [`GlobalSummary`].

use crate::error::Result;
use crate::types::{MigrationRecord, MigrationStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Counters shared by project summaries and run totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTotals {
    /// Repositories processed.
    pub total: u64,
    /// Migrated repositories.
    pub created: u64,
    /// Creations rejected because the alias was taken.
    pub exists: u64,
    /// Repositories carrying large-file content. Counted on detection, even
    /// when the mirror push or the large-file push later failed.
    pub lfs_pushed: u64,
    /// Filtered out.
    pub skipped: u64,
    /// Failed.
    pub errors: u64,
}

impl SummaryTotals {
    /// Whether `total == created + skipped + errors`.
    pub fn is_balanced(&self) -> bool {
        self.total == self.created + self.skipped + self.errors
    }
}

impl AddAssign for SummaryTotals {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.created += other.created;
        self.exists += other.exists;
        self.lfs_pushed += other.lfs_pushed;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

/// Outcome of every repository of one source project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub totals: SummaryTotals,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Records in processing order.
    pub items: Vec<MigrationRecord>,
}

impl Default for ProjectSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectSummary {
    /// An empty summary started now.
    pub fn new() -> Self {
        Self {
            totals: SummaryTotals::default(),
            started_at: Utc::now(),
            finished_at: None,
            items: Vec::new(),
        }
    }

    /// Fold one finalized record.
    ///
    /// Each record counts towards exactly one of `created`, `skipped` and
    /// `errors`. `lfs_pushed` counts large-file presence, not push success.
    pub fn record(&mut self, record: MigrationRecord) {
        let totals = &mut self.totals;
        totals.total += 1;
        match record.status() {
            MigrationStatus::Ok => totals.created += 1,
            MigrationStatus::Skipped => totals.skipped += 1,
            MigrationStatus::Failed => totals.errors += 1,
            MigrationStatus::Pending => {
                warn!(alias = %record.alias, "Record was not finalized, counting as error");
                totals.errors += 1;
            }
        }
        if record.has_lfs {
            totals.lfs_pushed += 1;
        }
        if record.alias_taken {
            totals.exists += 1;
        }
        self.items.push(record);
    }

    /// Stamp the end time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Records with the given status.
    pub fn items_with_status(&self, status: MigrationStatus) -> impl Iterator<Item = &MigrationRecord> {
        self.items.iter().filter(move |r| r.status() == status)
    }
}

/// One project entry of the global report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub project_key: String,
    pub base_url: String,
    pub summary: ProjectSummary,

    /// Why the project could not be processed, if it could not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Every project of a run plus field-wise totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSummary {
    pub projects: Vec<ProjectReport>,
    pub totals: SummaryTotals,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Collects project summaries for one run.
#[derive(Debug)]
pub struct RunAggregator {
    summary: GlobalSummary,
}

impl Default for RunAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl RunAggregator {
    /// Start a run now.
    pub fn new() -> Self {
        Self {
            summary: GlobalSummary {
                projects: Vec::new(),
                totals: SummaryTotals::default(),
                started_at: Utc::now(),
                finished_at: None,
            },
        }
    }

    /// Add a processed project.
    pub fn add_project(
        &mut self,
        project_key: impl Into<String>,
        base_url: impl Into<String>,
        summary: ProjectSummary,
    ) {
        self.push(project_key.into(), base_url.into(), summary, None);
    }

    /// Add a project whose repositories could not be listed.
    pub fn add_failed_project(
        &mut self,
        project_key: impl Into<String>,
        base_url: impl Into<String>,
        error: impl Into<String>,
    ) {
        let mut summary = ProjectSummary::new();
        summary.finish();
        self.push(
            project_key.into(),
            base_url.into(),
            summary,
            Some(crate::command::mask_credentials(&error.into())),
        );
    }

    fn push(&mut self, project_key: String, base_url: String, summary: ProjectSummary, error: Option<String>) {
        debug!(project = %project_key, totals = ?summary.totals, "Aggregated project");
        self.summary.projects.push(ProjectReport {
            project_key,
            base_url,
            summary,
            error,
        });
    }

    /// Projects added so far.
    pub fn projects(&self) -> &[ProjectReport] {
        &self.summary.projects
    }

    /// Sum the project totals and stamp the end time.
    pub fn finish(mut self) -> GlobalSummary {
        let mut totals = SummaryTotals::default();
        for project in &self.summary.projects {
            totals += project.summary.totals;
        }
        self.summary.totals = totals;
        self.summary.finished_at = Some(Utc::now());
        self.summary
    }
}

/// Where the report for `project_key` goes, next to the global report.
pub fn project_report_path(global_report: &Path, project_key: &str) -> PathBuf {
    let file = format!("report_{}.json", project_key.to_lowercase());
    match global_report.parent() {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), "Wrote report");
    Ok(())
}
