//! GitFlic project creation.

use crate::command::mask_credentials;
use crate::config::MAX_DESCRIPTION_CHARS;
use crate::error::{is_transient_status, MigrationError, Result};
use crate::retry::RetryPolicy;
use crate::types::{OwnerAliasType, TransferTarget};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default management API root.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/rest-api";

/// Creates projects on the destination host.
#[async_trait]
pub trait ProjectCreator: Send + Sync {
    /// Create a project.
    ///
    /// Any HTTP response, including a rejection, is returned as a
    /// [`CreateProjectResponse`]; only a request that never got an answer
    /// is an error.
    async fn create_project(&self, request: &CreateProjectRequest) -> Result<CreateProjectResponse>;
}

/// Body of `POST /project`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub is_private: bool,
    pub alias: String,
    pub owner_alias: String,
    pub owner_alias_type: OwnerAliasType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Cut `description` to the length the destination accepts.
pub fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_CHARS).collect()
}

/// Response payload, JSON when it parses, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    /// Classify a raw body.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text.to_string()),
        }
    }
}

impl std::fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Status and body of a create-project call.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateProjectResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl CreateProjectResponse {
    /// Whether the project was created.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Transport URLs from a successful JSON response.
    pub fn transfer_target(&self) -> Option<TransferTarget> {
        match &self.body {
            ResponseBody::Json(value) => serde_json::from_value(value.clone()).ok(),
            ResponseBody::Text(_) => None,
        }
    }

    /// Whether the rejection says the alias is already taken.
    pub fn indicates_existing(&self) -> bool {
        !self.is_success()
            && (self.status == 409 || self.body.to_string().to_lowercase().contains("exist"))
    }
}

/// Client for the GitFlic REST API.
pub struct GitFlicClient {
    client: Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl GitFlicClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("bb2gf/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MigrationError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The API root requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_project(&self, request: &CreateProjectRequest) -> Result<CreateProjectResponse> {
        let response = self
            .client
            .post(format!("{}/project", self.base_url))
            .header("Authorization", format!("token {}", self.token))
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        if is_transient_status(status) {
            return Err(MigrationError::transport(Some(status), text));
        }
        Ok(CreateProjectResponse {
            status,
            body: ResponseBody::parse(&mask_credentials(&text)),
        })
    }
}

#[async_trait]
impl ProjectCreator for GitFlicClient {
    async fn create_project(&self, request: &CreateProjectRequest) -> Result<CreateProjectResponse> {
        let this = self;
        let result = self
            .retry
            .execute("create project", move || async move {
                this.post_project(request).await
            })
            .await;

        match result {
            Ok(response) => {
                debug!(alias = %request.alias, status = response.status, "Create project answered");
                Ok(response)
            }
            // Retries exhausted on a status answer: report it like any rejection
            Err(MigrationError::Transport {
                status: Some(status),
                message,
            }) => {
                warn!(alias = %request.alias, status, "Create project kept failing");
                Ok(CreateProjectResponse {
                    status,
                    body: ResponseBody::parse(&message),
                })
            }
            Err(e) => Err(e),
        }
    }
}
