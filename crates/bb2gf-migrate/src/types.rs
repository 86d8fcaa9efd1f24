//! Common types for migration operations.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::MigrationError;

/// A repository as listed by the source host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    /// Human label; falls back to `slug` when the source omits it.
    pub name: String,

    /// Stable source identifier.
    pub slug: String,

    /// Free-form description (empty when absent).
    pub description: String,

    /// HTTP(S) clone URL.
    pub clone_url_http: Option<String>,

    /// SSH clone URL.
    pub clone_url_ssh: Option<String>,

    /// Key of the source project owning the repository.
    pub project_key: String,
}

impl RepositoryDescriptor {
    /// Create a descriptor with no description and no clone URLs.
    pub fn new(project_key: impl Into<String>, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            name: slug.clone(),
            slug,
            description: String::new(),
            clone_url_http: None,
            clone_url_ssh: None,
            project_key: project_key.into(),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the HTTP clone URL.
    pub fn with_http_url(mut self, url: impl Into<String>) -> Self {
        self.clone_url_http = Some(url.into());
        self
    }

    /// Set the SSH clone URL.
    pub fn with_ssh_url(mut self, url: impl Into<String>) -> Self {
        self.clone_url_ssh = Some(url.into());
        self
    }
}

/// Transport URLs of a freshly created destination project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferTarget {
    /// HTTPS push URL.
    pub http_transport_url: Option<String>,

    /// SSH push URL.
    pub ssh_transport_url: Option<String>,
}

impl TransferTarget {
    /// The URL matching `mode`, if the destination returned one.
    pub fn url_for(&self, mode: TransportMode) -> Option<&str> {
        let url = match mode {
            TransportMode::Ssh => self.ssh_transport_url.as_deref(),
            TransportMode::Https => self.http_transport_url.as_deref(),
        };
        url.filter(|u| !u.trim().is_empty())
    }
}

/// Git transport used for both clone and push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// HTTPS with credentials embedded in the URL.
    #[default]
    Https,
    /// SSH, authenticated by the local agent.
    Ssh,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Https => write!(f, "https"),
            Self::Ssh => write!(f, "ssh"),
        }
    }
}

/// Kind of destination owner a project is created under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OwnerAliasType {
    /// A team.
    #[default]
    Team,
    /// A company.
    Company,
}

impl FromStr for OwnerAliasType {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "" | "TEAM" => Ok(Self::Team),
            "COMPANY" => Ok(Self::Company),
            other => Err(MigrationError::Configuration(format!(
                "owner alias type must be TEAM or COMPANY, got '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for OwnerAliasType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Team => write!(f, "TEAM"),
            Self::Company => write!(f, "COMPANY"),
        }
    }
}

/// Lifecycle state of a [`MigrationRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrationStatus {
    /// The pipeline has not finished yet.
    #[default]
    Pending,
    /// Filtered out.
    Skipped,
    /// Migrated.
    Ok,
    /// A required step failed.
    Failed,
}

impl MigrationStatus {
    /// Whether the status is final.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Skipped => write!(f, "SKIPPED"),
            Self::Ok => write!(f, "OK"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of migrating one repository.
///
/// Starts `PENDING` and moves exactly once to a terminal status through
/// [`skip`](Self::skip), [`succeed`](Self::succeed) or [`fail`](Self::fail);
/// later transitions are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Source repository name.
    #[serde(rename = "repo")]
    pub repo_name: String,

    /// Destination alias.
    pub alias: String,

    /// Whether the destination project was created.
    pub created: bool,

    /// Whether large-file content was detected.
    #[serde(rename = "lfs")]
    pub has_lfs: bool,

    /// Result of the large-file push, when one was attempted.
    #[serde(rename = "lfs_push_ok", skip_serializing_if = "Option::is_none", default)]
    pub lfs_push_ok: Option<bool>,

    /// Whether the destination reported that the alias is already taken.
    #[serde(skip)]
    pub alias_taken: bool,

    /// Wall-clock duration, rounded to hundredths of a second.
    #[serde(rename = "duration_s")]
    pub duration_secs: Option<f64>,

    status: MigrationStatus,

    /// Outcome message (reason for skip or failure).
    pub message: String,
}

impl MigrationRecord {
    /// Create a pending record.
    pub fn new(repo_name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            alias: alias.into(),
            created: false,
            has_lfs: false,
            lfs_push_ok: None,
            alias_taken: false,
            duration_secs: None,
            status: MigrationStatus::Pending,
            message: String::new(),
        }
    }

    /// Current status.
    pub fn status(&self) -> MigrationStatus {
        self.status
    }

    /// Mark as skipped.
    pub fn skip(&mut self, message: impl Into<String>) {
        self.finish(MigrationStatus::Skipped, message.into());
    }

    /// Mark as migrated.
    pub fn succeed(&mut self, message: impl Into<String>) {
        self.finish(MigrationStatus::Ok, message.into());
    }

    /// Mark as failed.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.finish(MigrationStatus::Failed, message.into());
    }

    /// Record elapsed time.
    pub fn set_duration(&mut self, elapsed: Duration) {
        self.duration_secs = Some((elapsed.as_secs_f64() * 100.0).round() / 100.0);
    }

    fn finish(&mut self, status: MigrationStatus, message: String) {
        if self.status.is_terminal() {
            tracing::debug!(
                alias = %self.alias,
                current = %self.status,
                ignored = %status,
                "Record already finalized"
            );
            return;
        }
        self.status = status;
        self.message = crate::command::mask_credentials(&message);
    }
}
