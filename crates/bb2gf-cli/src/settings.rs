//! Environment settings.
//!
//! Everything is read once through a lookup function so the rest of the
//! program never touches the process environment.

use bb2gf_migrate::{
    BitbucketAuth, GitCredentials, MigrationError, OwnerAliasType, Result, TlsOptions,
    TransportMode, DEFAULT_API_BASE_URL, DEFAULT_COMMAND_TIMEOUT, DEFAULT_WORKDIR,
};
use std::path::PathBuf;
use std::time::Duration;

/// Source host access.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub auth: BitbucketAuth,
    pub git_credentials: GitCredentials,
    pub tls: TlsOptions,
}

/// Validated run settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: SourceSettings,
    pub gitflic_api_base: String,
    pub gitflic_token: String,
    /// Lower-cased `GITFLIC_OWNER_ALIAS`, if set.
    pub owner_alias: Option<String>,
    pub owner_type: OwnerAliasType,
    pub gitflic_git: Option<GitCredentials>,
    pub mode: TransportMode,
    pub private: bool,
    pub language: Option<String>,
    pub dry_run: bool,
    pub workdir: PathBuf,
    pub keep_clones: bool,
    pub git_timeout: Duration,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str, default: bool| -> Result<bool> {
            get(key).map_or(Ok(default), |v| parse_bool(key, &v))
        };

        let gitflic_token = get("GITFLIC_API_TOKEN").ok_or_else(|| {
            MigrationError::Configuration("GITFLIC_API_TOKEN is not set".to_string())
        })?;

        let owner_type = get("GITFLIC_OWNER_ALIAS_TYPE")
            .unwrap_or_default()
            .parse::<OwnerAliasType>()?;

        let gitflic_git = get("GITFLIC_GIT_USERNAME").map(|user| {
            GitCredentials::new(user, get("GITFLIC_GIT_PASSWORD").unwrap_or_default())
        });

        let git_timeout = match get("GIT_TIMEOUT_SECS") {
            None => DEFAULT_COMMAND_TIMEOUT,
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    MigrationError::Configuration(format!(
                        "GIT_TIMEOUT_SECS must be a positive number of seconds, got '{raw}'"
                    ))
                })?,
        };

        Ok(Self {
            source: source_settings(&get, &flag)?,
            gitflic_api_base: get("GITFLIC_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            gitflic_token,
            owner_alias: get("GITFLIC_OWNER_ALIAS").map(|a| a.to_lowercase()),
            owner_type,
            gitflic_git,
            mode: if flag("USE_SSH", false)? {
                TransportMode::Ssh
            } else {
                TransportMode::Https
            },
            private: flag("VISIBILITY_PRIVATE", true)?,
            language: get("LANGUAGE_DEFAULT"),
            dry_run: flag("DRY_RUN", false)?,
            workdir: get("WORKDIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKDIR)),
            keep_clones: flag("KEEP_CLONES", false)?,
            git_timeout,
        })
    }
}

fn source_settings(
    get: &impl Fn(&str) -> Option<String>,
    flag: &impl Fn(&str, bool) -> Result<bool>,
) -> Result<SourceSettings> {
    let username = get("BITBUCKET_USERNAME").unwrap_or_default();
    let git_username = get("BITBUCKET_GIT_USERNAME").unwrap_or_else(|| username.clone());
    let git_password = get("BITBUCKET_GIT_PASSWORD");

    let auth_type = get("BITBUCKET_AUTH_TYPE")
        .unwrap_or_else(|| "BASIC".to_string())
        .to_uppercase();
    let (auth, git_credentials) = match auth_type.as_str() {
        "BASIC" => {
            let password = get("BITBUCKET_PASSWORD").unwrap_or_default();
            if username.is_empty() {
                return Err(MigrationError::Configuration(
                    "BITBUCKET_USERNAME is required for BASIC authentication".to_string(),
                ));
            }
            let git = GitCredentials::new(git_username, git_password.unwrap_or(password.clone()));
            (BitbucketAuth::Basic { username, password }, git)
        }
        "TOKEN" => {
            let token = get("BITBUCKET_TOKEN").ok_or_else(|| {
                MigrationError::Configuration(
                    "BITBUCKET_TOKEN is required for TOKEN authentication".to_string(),
                )
            })?;
            let git = GitCredentials::new(git_username, git_password.unwrap_or(token.clone()));
            (BitbucketAuth::Token(token), git)
        }
        other => {
            return Err(MigrationError::Configuration(format!(
                "BITBUCKET_AUTH_TYPE must be BASIC or TOKEN, got '{other}'"
            )))
        }
    };

    Ok(SourceSettings {
        auth,
        git_credentials,
        tls: TlsOptions {
            verify: flag("BITBUCKET_VERIFY_TLS", true)?,
            ca_cert: get("BITBUCKET_CA_CERT").map(PathBuf::from),
        },
    })
}

/// Parse a boolean environment value.
pub fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(MigrationError::Configuration(format!(
            "{key} must be true or false, got '{other}'"
        ))),
    }
}
