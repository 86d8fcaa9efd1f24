//! CLI command implementations.

use crate::logging::LogFormat;
use crate::render;
use crate::settings::Settings;
use crate::targets::{build_targets, owner_alias_for, Target};

use anyhow::Context;
use bb2gf_migrate::{
    project_report_path, write_json, BitbucketClient, CommandRunner, ConsoleProgressReporter,
    GitFlicClient, GitTransport, GlobalSummary, MigrationConfig, MigrationError,
    MigrationProgress, Migrator, PipelineSettings, RepositoryFilter, RunAggregator,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Invalid invocation, reported with exit code 2.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Exit code for a fatal error: 2 for usage and configuration problems, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    let is_usage = err.chain().any(|cause| {
        cause.is::<UsageError>()
            || matches!(
                cause.downcast_ref::<MigrationError>(),
                Some(MigrationError::Configuration(_))
            )
    });
    if is_usage {
        2
    } else {
        1
    }
}

/// Arguments of `bb2gf migrate`.
#[derive(Debug, Clone, Default)]
pub struct MigrateArgs {
    pub project_urls: Vec<String>,
    pub project_keys: Vec<String>,
    /// Overrides `DRY_RUN` when set.
    pub dry_run: Option<bool>,
    pub config: PathBuf,
    pub workdir: Option<PathBuf>,
    pub keep_clones: bool,
    pub log_format: LogFormat,
}

impl MigrateArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(dry_run) = self.dry_run {
            settings.dry_run = dry_run;
        }
        if let Some(workdir) = &self.workdir {
            settings.workdir.clone_from(workdir);
        }
        if self.keep_clones {
            settings.keep_clones = true;
        }
    }
}

/// Migrate every target project.
pub async fn migrate(args: MigrateArgs) -> anyhow::Result<()> {
    let config = MigrationConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    let mut settings = Settings::from_env().context("invalid environment")?;
    args.apply(&mut settings);

    let targets = build_targets(
        |key| std::env::var(key).ok(),
        &args.project_urls,
        &args.project_keys,
    )?;
    if targets.is_empty() {
        return Err(UsageError(
            "no target projects: pass --project-url/--project-key or set BITBUCKET_PROJECT_URL(S) \
             or BITBUCKET_BASE_URL with BITBUCKET_PROJECT_KEY(S)"
                .to_string(),
        )
        .into());
    }

    let show_progress = args.log_format == LogFormat::Pretty;
    let summary = run(&config, &settings, &targets, show_progress).await?;
    render::print_summary(&summary);
    Ok(())
}

/// Process `targets` in order and write the reports.
///
/// Every client is built before the first repository is touched, so
/// configuration problems abort the run early. A project whose listing fails
/// is recorded and the run moves on.
pub async fn run(
    config: &MigrationConfig,
    settings: &Settings,
    targets: &[Target],
    show_progress: bool,
) -> anyhow::Result<GlobalSummary> {
    RepositoryFilter::new(&config.filters).context("invalid repository filters")?;

    let creator = Arc::new(
        GitFlicClient::new(&settings.gitflic_api_base, settings.gitflic_token.clone())
            .context("failed to create GitFlic client")?,
    );
    let transport = Arc::new(
        GitTransport::new(CommandRunner::new(settings.git_timeout))
            .with_source_ssl_no_verify(!settings.source.tls.verify),
    );

    let mut sources: HashMap<String, BitbucketClient> = HashMap::new();
    for target in targets {
        if !sources.contains_key(&target.base_url) {
            let client = BitbucketClient::new(
                &target.base_url,
                settings.source.auth.clone(),
                &settings.source.tls,
            )
            .with_context(|| format!("failed to create client for {}", target.base_url))?;
            sources.insert(target.base_url.clone(), client);
        }
    }

    if settings.owner_alias.is_some() && targets.len() > 1 {
        warn!(
            targets = targets.len(),
            "GITFLIC_OWNER_ALIAS ignored for several projects, using each project key"
        );
    }

    let mut aggregator = RunAggregator::new();
    for target in targets {
        let Some(source) = sources.get(&target.base_url) else {
            continue;
        };
        let pipeline = pipeline_settings(
            settings,
            owner_alias_for(target, settings.owner_alias.as_deref(), targets.len()),
        );
        render::print_header(target, creator.base_url(), &pipeline);

        let reporter = if show_progress {
            ConsoleProgressReporter::new(&target.project_key)
        } else {
            ConsoleProgressReporter::hidden()
        };
        let migrator = Migrator::new(creator.clone(), transport.clone(), config, pipeline)?
            .with_progress(MigrationProgress::with_callback(reporter.callback()));

        match migrator.run_project(source, &target.project_key).await {
            Ok(summary) => {
                reporter.finish(&render::totals_line(&summary.totals));
                reporter.suspend(|| render::print_failures(&summary));
                info!(
                    project = %target.project_key,
                    total = summary.totals.total,
                    created = summary.totals.created,
                    errors = summary.totals.errors,
                    "Project done"
                );
                aggregator.add_project(&target.project_key, &target.base_url, summary);
                if let Some(report) = aggregator.projects().last() {
                    let path = project_report_path(&config.report.path, &target.project_key);
                    if let Err(e) = write_json(&path, report) {
                        error!(path = %path.display(), error = %e, "Failed to write project report");
                    }
                }
            }
            Err(e) => {
                reporter.finish("listing failed");
                error!(project = %target.project_key, error = %e, "Failed to list repositories");
                aggregator.add_failed_project(&target.project_key, &target.base_url, e.to_string());
            }
        }
    }

    let summary = aggregator.finish();
    if let Err(e) = write_json(&config.report.path, &summary) {
        error!(path = %config.report.path.display(), error = %e, "Failed to write report");
    } else {
        info!(path = %config.report.path.display(), "Report written");
    }
    Ok(summary)
}

fn pipeline_settings(settings: &Settings, owner_alias: String) -> PipelineSettings {
    let mut pipeline = PipelineSettings::new(owner_alias);
    pipeline.owner_type = settings.owner_type;
    pipeline.private = settings.private;
    pipeline.language.clone_from(&settings.language);
    pipeline.mode = settings.mode;
    pipeline.dry_run = settings.dry_run;
    pipeline.workdir.clone_from(&settings.workdir);
    pipeline.keep_clones = settings.keep_clones;
    pipeline.source_credentials = Some(settings.source.git_credentials.clone()).filter(|c| c.is_set());
    pipeline.destination_credentials.clone_from(&settings.gitflic_git);
    pipeline
}
