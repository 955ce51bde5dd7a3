//! GitHub hosting client: one write call per task, creating a remote
//! repository in the target organization.
//!
//! Failures are surfaced structurally rather than as opaque strings, since
//! the orchestrator has to distinguish an ordinary 422 (name conflict,
//! validation error) from a 403 carrying rate-limit headers, which aborts
//! the whole batch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const GITHUB_API_URL: &str = "https://api.github.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body for `POST /orgs/{org}/repos`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepoRequest {
    pub name: String,
    pub description: String,
    pub private: bool,
}

/// Error payload GitHub attaches to 4xx responses (subset of fields).
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Rate-limit state parsed from the `x-ratelimit-*` headers of a 403
/// response. Diagnostic only; its presence is what makes the failure fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    /// Maximum requests permitted per window.
    pub limit: u64,
    /// Requests remaining in the current window.
    pub remaining: u64,
    /// Requests already made in the current window.
    pub used: u64,
    /// When the window resets, in UTC epoch seconds.
    pub reset_epoch_secs: i64,
}

impl RateLimitSnapshot {
    /// The reset instant rendered in the operator's local timezone.
    pub fn reset_local_time(&self) -> String {
        use chrono::TimeZone;
        match chrono::Local.timestamp_opt(self.reset_epoch_secs, 0) {
            chrono::LocalResult::Single(dt) => dt.to_rfc2822(),
            _ => format!("epoch {}", self.reset_epoch_secs),
        }
    }
}

/// A failed repository-creation call.
#[derive(Debug, Error)]
pub enum ApiFailure {
    #[error("GitHub returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Messages from GitHub's structured `errors` list, if present.
        errors: Vec<String>,
        /// Populated only for 403 responses carrying rate-limit headers.
        rate_limit: Option<RateLimitSnapshot>,
    },

    #[error("GitHub request timed out")]
    Timeout,

    #[error("GitHub request failed: {0}")]
    Transport(String),
}

impl ApiFailure {
    /// A failure is fatal when it is a 403 with rate-limit headers:
    /// continuing would only produce identical failures and risks
    /// extending the ban window.
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            ApiFailure::Status {
                status: 403,
                rate_limit: Some(_),
                ..
            }
        )
    }

    pub fn rate_limit(&self) -> Option<&RateLimitSnapshot> {
        match self {
            ApiFailure::Status { rate_limit, .. } => rate_limit.as_ref(),
            _ => None,
        }
    }
}

/// The single capability the orchestrator requires from the hosting API.
#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn create_repo(
        &self,
        organization: &str,
        request: &CreateRepoRequest,
    ) -> Result<(), ApiFailure>;
}

/// Production client backed by the GitHub REST API.
pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: String) -> Result<Self, reqwest::Error> {
        Self::with_base_url(token, GITHUB_API_URL.to_string())
    }

    /// Point the client at a different API root (e.g. a GitHub Enterprise
    /// instance, or a local server in tests).
    ///
    /// Fails if the underlying HTTP client cannot be constructed; the
    /// request timeout is never silently dropped.
    pub fn with_base_url(token: String, base_url: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            token,
            base_url,
        })
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn create_repo(
        &self,
        organization: &str,
        request: &CreateRepoRequest,
    ) -> Result<(), ApiFailure> {
        let url = format!("{}/orgs/{}/repos", self.base_url, organization);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "repogen")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiFailure::Timeout
                } else {
                    ApiFailure::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let rate_limit = if status.as_u16() == 403 {
            parse_rate_limit_headers(resp.headers())
        } else {
            None
        };

        let body: ApiErrorBody = resp.json().await.unwrap_or(ApiErrorBody {
            message: None,
            errors: Vec::new(),
        });

        Err(ApiFailure::Status {
            status: status.as_u16(),
            message: body
                .message
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
            errors: body.errors.into_iter().filter_map(|e| e.message).collect(),
            rate_limit,
        })
    }
}

/// Parse the four `x-ratelimit-*` headers. Returns `None` unless all four
/// are present and numeric, so an ordinary 403 (bad token, missing scope)
/// is never misclassified as rate-limit exhaustion.
fn parse_rate_limit_headers(headers: &reqwest::header::HeaderMap) -> Option<RateLimitSnapshot> {
    fn header_num<T: std::str::FromStr>(
        headers: &reqwest::header::HeaderMap,
        name: &str,
    ) -> Option<T> {
        headers.get(name)?.to_str().ok()?.trim().parse().ok()
    }

    Some(RateLimitSnapshot {
        limit: header_num(headers, "x-ratelimit-limit")?,
        remaining: header_num(headers, "x-ratelimit-remaining")?,
        used: header_num(headers, "x-ratelimit-used")?,
        reset_epoch_secs: header_num(headers, "x-ratelimit-reset")?,
    })
}
