//! # bb2gf migration library
//!
//! Moves every repository of one or more Bitbucket Server projects to
//! GitFlic: the destination project is created through the GitFlic REST
//! API, then the repository is mirrored with `git clone --mirror` /
//! `git push --mirror`, large-file objects included.
//!
//! ## Components
//!
//! - [`CommandRunner`]: non-interactive `git` execution with credential masking
//! - [`GitTransport`]: mirror clone/push and best-effort LFS transfer
//! - [`BitbucketClient`]: paginated repository listing
//! - [`GitFlicClient`]: project creation
//! - [`make_alias`] and [`RepositoryFilter`]: naming and filtering
//! - [`Migrator`]: the per-repository pipeline
//! - [`RunAggregator`]: project and run summaries
//!
//! ## Example
//!
//! ```rust,ignore
//! use bb2gf_migrate::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MigrationConfig::load("config.yml".as_ref())?;
//!     let source = BitbucketClient::new(
//!         "https://bitbucket.example.com",
//!         BitbucketAuth::Token("bb_token".into()),
//!         &TlsOptions::default(),
//!     )?;
//!     let creator = Arc::new(GitFlicClient::new(DEFAULT_API_BASE_URL, "gf_token")?);
//!     let transport = Arc::new(GitTransport::default());
//!
//!     let migrator = Migrator::new(creator, transport, &config, PipelineSettings::new("core"))?;
//!     let summary = migrator.run_project(&source, "CORE").await?;
//!
//!     let mut aggregator = RunAggregator::new();
//!     aggregator.add_project("CORE", "https://bitbucket.example.com", summary);
//!     write_json(&config.report.path, &aggregator.finish())?;
//!     Ok(())
//! }
//! ```

pub mod bitbucket;
pub mod command;
pub mod config;
pub mod error;
pub mod gitflic;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod retry;
pub mod transport;
pub mod types;

// Re-export main types
pub use bitbucket::{BitbucketAuth, BitbucketClient, RepositorySource, TlsOptions};
pub use command::{mask_credentials, CommandRunner, DEFAULT_COMMAND_TIMEOUT};
pub use config::{
    with_https_creds, FilterConfig, GitCredentials, MigrationConfig, NamingConfig,
    PipelineSettings, ReportConfig, DEFAULT_REPORT_PATH, DEFAULT_WORKDIR,
};
pub use error::{MigrationError, Result};
pub use gitflic::{
    CreateProjectRequest, CreateProjectResponse, GitFlicClient, ProjectCreator, ResponseBody,
    DEFAULT_API_BASE_URL,
};
pub use naming::{make_alias, match_any, validate_alias, FilterDecision, RepositoryFilter};
pub use pipeline::Migrator;
pub use progress::{
    ConsoleProgressReporter, MigrationPhase, MigrationProgress, ProgressCallback, ProgressUpdate,
};
pub use report::{
    project_report_path, write_json, GlobalSummary, ProjectReport, ProjectSummary, RunAggregator,
    SummaryTotals,
};
pub use retry::RetryPolicy;
pub use transport::{GitTransport, LfsOutcome, MirrorTransport};
pub use types::*;

/// Version of the migration tools.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
