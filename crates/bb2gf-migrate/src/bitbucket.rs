//! Bitbucket Server repository listing.

use crate::error::{MigrationError, Result};
use crate::retry::{status_error, RetryPolicy};
use crate::types::RepositoryDescriptor;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Page size requested from the server.
pub const PAGE_LIMIT: u64 = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only access to the repositories of a source project.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Every repository of `project_key`, in server order.
    async fn list_repositories(&self, project_key: &str) -> Result<Vec<RepositoryDescriptor>>;
}

/// How API calls authenticate.
#[derive(Clone)]
pub enum BitbucketAuth {
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// Personal access token sent as a bearer token.
    Token(String),
}

impl std::fmt::Debug for BitbucketAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Token(_) => f.write_str("Token(***)"),
        }
    }
}

/// TLS options for the source host.
#[derive(Debug, Clone)]
pub struct TlsOptions {
    /// Verify server certificates.
    pub verify: bool,
    /// Extra trusted root certificate (PEM).
    pub ca_cert: Option<PathBuf>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            verify: true,
            ca_cert: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoPage {
    #[serde(default)]
    values: Vec<BitbucketRepo>,
    #[serde(default = "default_last_page")]
    is_last_page: bool,
    next_page_start: Option<u64>,
}

fn default_last_page() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct BitbucketRepo {
    name: Option<String>,
    slug: String,
    description: Option<String>,
    #[serde(default)]
    links: BitbucketLinks,
}

#[derive(Debug, Default, Deserialize)]
struct BitbucketLinks {
    #[serde(default)]
    clone: Vec<BitbucketCloneLink>,
}

#[derive(Debug, Deserialize)]
struct BitbucketCloneLink {
    href: String,
    name: String,
}

impl BitbucketRepo {
    fn into_descriptor(self, project_key: &str) -> RepositoryDescriptor {
        let clone_url = |kind: &str| {
            self.links
                .clone
                .iter()
                .find(|l| l.name == kind)
                .map(|l| l.href.clone())
        };
        let http = clone_url("http");
        let ssh = clone_url("ssh");

        RepositoryDescriptor {
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| self.slug.clone()),
            slug: self.slug,
            description: self.description.unwrap_or_default(),
            clone_url_http: http,
            clone_url_ssh: ssh,
            project_key: project_key.to_string(),
        }
    }
}

/// Client for the Bitbucket Server REST API 1.0.
pub struct BitbucketClient {
    client: Client,
    api_url: String,
    auth: BitbucketAuth,
    retry: RetryPolicy,
}

impl BitbucketClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str, auth: BitbucketAuth, tls: &TlsOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("bb2gf/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!tls.verify);

        if let Some(path) = &tls.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                MigrationError::Configuration(format!(
                    "cannot read CA certificate {}: {e}",
                    path.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                MigrationError::Configuration(format!(
                    "invalid CA certificate {}: {e}",
                    path.display()
                ))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| MigrationError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: format!("{}/rest/api/1.0", base_url.trim_end_matches('/')),
            auth,
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_page(&self, project_key: &str, start: u64) -> Result<RepoPage> {
        let url = format!("{}/projects/{project_key}/repos", self.api_url);
        let request = self
            .client
            .get(&url)
            .query(&[("limit", PAGE_LIMIT), ("start", start)]);
        let request = match &self.auth {
            BitbucketAuth::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            BitbucketAuth::Token(token) => request.bearer_auth(token),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RepositorySource for BitbucketClient {
    async fn list_repositories(&self, project_key: &str) -> Result<Vec<RepositoryDescriptor>> {
        let mut repos = Vec::new();
        let mut start = 0;

        loop {
            let this = self;
            let page = self
                .retry
                .execute("list repositories", move || async move {
                    this.fetch_page(project_key, start).await
                })
                .await?;

            debug!(
                project = project_key,
                start,
                count = page.values.len(),
                last = page.is_last_page,
                "Fetched repository page"
            );
            repos.extend(
                page.values
                    .into_iter()
                    .map(|repo| repo.into_descriptor(project_key)),
            );

            if page.is_last_page {
                break;
            }
            match page.next_page_start {
                Some(next) if next > start => start = next,
                other => {
                    warn!(
                        project = project_key,
                        start,
                        next = ?other,
                        "Pagination did not advance, stopping"
                    );
                    break;
                }
            }
        }

        info!(project = project_key, count = repos.len(), "Listed repositories");
        Ok(repos)
    }
}
