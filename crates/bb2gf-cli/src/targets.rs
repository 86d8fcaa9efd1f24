//! Resolution of the source projects to migrate.

use bb2gf_migrate::{MigrationError, Result};
use tracing::warn;
use url::Url;

/// One source project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    /// `scheme://host[:port]` of the source server.
    pub base_url: String,
    /// Project key.
    pub project_key: String,
}

impl Target {
    pub fn new(base_url: impl Into<String>, project_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_key: project_key.into(),
        }
    }
}

/// Split a comma or newline separated list, dropping blanks.
pub fn split_env_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split `https://host[:port]/.../projects/KEY[/...]` into base URL and key.
pub fn parse_project_url(raw: &str) -> Result<Target> {
    let invalid = || {
        MigrationError::Configuration(format!("cannot extract a project key from URL '{raw}'"))
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if url.host_str().is_none() {
        return Err(invalid());
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    let key = segments
        .iter()
        .position(|s| *s == "projects")
        .and_then(|i| segments.get(i + 1))
        .ok_or_else(invalid)?;

    Ok(Target::new(url.origin().ascii_serialization(), *key))
}

/// Resolve the targets from CLI arguments and the environment.
///
/// The first non-empty source wins:
/// 1. `--project-url`
/// 2. `BITBUCKET_PROJECT_URLS`
/// 3. `--project-key` with `BITBUCKET_BASE_URL`
/// 4. `BITBUCKET_PROJECT_URL`
/// 5. `BITBUCKET_BASE_URL` with `BITBUCKET_PROJECT_KEYS` or `BITBUCKET_PROJECT_KEY`
///
/// Duplicates are dropped, keeping the first occurrence.
pub fn build_targets<F>(lookup: F, cli_urls: &[String], cli_keys: &[String]) -> Result<Vec<Target>>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let base_url = || get("BITBUCKET_BASE_URL").map(|b| b.trim().trim_end_matches('/').to_string());
    let env_urls = split_env_list(get("BITBUCKET_PROJECT_URLS").as_deref());

    let targets = if !cli_urls.is_empty() {
        cli_urls
            .iter()
            .map(|u| parse_project_url(u))
            .collect::<Result<Vec<_>>>()?
    } else if !env_urls.is_empty() {
        env_urls
            .iter()
            .map(|u| parse_project_url(u))
            .collect::<Result<Vec<_>>>()?
    } else if !cli_keys.is_empty() {
        let base = base_url().ok_or_else(|| {
            MigrationError::Configuration("--project-key requires BITBUCKET_BASE_URL".to_string())
        })?;
        cli_keys
            .iter()
            .map(|k| Target::new(base.clone(), k.trim()))
            .collect()
    } else if let Some(url) = get("BITBUCKET_PROJECT_URL") {
        vec![parse_project_url(&url)?]
    } else {
        let mut keys = split_env_list(get("BITBUCKET_PROJECT_KEYS").as_deref());
        if keys.is_empty() {
            keys = split_env_list(get("BITBUCKET_PROJECT_KEY").as_deref());
        }
        match base_url() {
            Some(base) => keys.into_iter().map(|k| Target::new(base.clone(), k)).collect(),
            None => {
                if !keys.is_empty() {
                    warn!("Project keys are set but BITBUCKET_BASE_URL is not");
                }
                Vec::new()
            }
        }
    };

    let mut unique: Vec<Target> = Vec::with_capacity(targets.len());
    for target in targets {
        if !unique.contains(&target) {
            unique.push(target);
        }
    }
    Ok(unique)
}

/// Owner alias for `target` when `target_count` projects are processed.
///
/// A configured alias only applies to a single-project run; otherwise each
/// project goes under its own lower-cased key.
pub fn owner_alias_for(target: &Target, configured: Option<&str>, target_count: usize) -> String {
    match configured {
        Some(alias) if target_count == 1 => alias.trim().to_lowercase(),
        _ => target.project_key.trim().to_lowercase(),
    }
}
