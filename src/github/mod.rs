//! GitHub REST client for enumerating an organization's repositories.
//!
//! The refresh service walks each org one page at a time through the
//! [`RepoLister`] trait; the production implementation here follows GitHub's
//! `Link` header for the page cursor. Errors are returned as-is: a failed
//! page aborts the caller's whole cycle, and retry policy belongs to the
//! refresh cadence, not to a single fetch.

mod errors;

pub use errors::GithubError;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// First page number in GitHub's pagination scheme.
pub const FIRST_PAGE: u32 = 1;

/// GitHub rejects `per_page` values above this.
const MAX_PER_PAGE: u32 = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One repository as returned by the listing endpoint. Only the fields the
/// service reads are modeled.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoSummary {
    /// Absent or empty for anomalous listings; such entries are skipped.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// A single page of an organization's repository listing.
#[derive(Debug)]
pub struct RepoPage {
    pub repos: Vec<RepoSummary>,
    /// `None` means this was the last page for the org.
    pub next_page: Option<u32>,
}

/// Paginated read access to one organization's repository listing.
///
/// One call fetches one page; the caller advances the cursor from the
/// previous response. Implementations do not retry.
#[async_trait]
pub trait RepoLister: Send + Sync {
    async fn list_page(&self, org: &str, page: u32) -> Result<RepoPage, GithubError>;
}

pub struct GithubApi {
    client: reqwest::Client,
    base_url: Url,
    per_page: u32,
}

impl GithubApi {
    /// Build a client for the listing API. An `api_key` upgrades the
    /// unauthenticated rate limit; `per_page` is clamped to GitHub's maximum.
    pub fn new(api_base: &str, api_key: Option<&str>, per_page: u32) -> Result<Self> {
        // Trailing slash so Url::join appends instead of replacing the path.
        let base_url = Url::parse(&format!("{}/", api_base.trim_end_matches('/')))
            .context("invalid API base URL")?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .context("API key is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("gofetch/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            base_url,
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        })
    }

    /// Remaining core-API quota, surfaced on the status endpoint.
    pub async fn rate_limit_remaining(&self) -> Result<u64, GithubError> {
        let url = self.base_url.join("rate_limit").map_err(|source| {
            GithubError::InvalidUrl {
                endpoint: "rate_limit".to_owned(),
                source,
            }
        })?;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GithubError::BadStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: RateLimitResponse =
            response
                .json()
                .await
                .map_err(|source| GithubError::ParseFailed {
                    url: url.to_string(),
                    source,
                })?;
        Ok(body.resources.core.remaining)
    }
}

#[async_trait]
impl RepoLister for GithubApi {
    async fn list_page(&self, org: &str, page: u32) -> Result<RepoPage, GithubError> {
        let endpoint = format!("orgs/{org}/repos");
        let url = self
            .base_url
            .join(&endpoint)
            .map_err(|source| GithubError::InvalidUrl { endpoint, source })?;

        let response = self
            .client
            .get(url.clone())
            .query(&[
                ("type", "public".to_owned()),
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GithubError::BadStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let next_page = next_page_from_link(
            response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok()),
        );
        let repos: Vec<RepoSummary> = response
            .json()
            .await
            .map_err(|source| GithubError::ParseFailed {
                url: url.to_string(),
                source,
            })?;

        Ok(RepoPage { repos, next_page })
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimitBucket,
}

#[derive(Debug, Deserialize)]
struct RateLimitBucket {
    remaining: u64,
}

/// Extract the next page number from a `Link` response header.
///
/// GitHub's pagination header looks like:
/// `<https://api.github.com/organizations/1/repos?page=3>; rel="next",
/// <https://api.github.com/organizations/1/repos?page=9>; rel="last"`
fn next_page_from_link(header: Option<&str>) -> Option<u32> {
    for part in header?.split(',') {
        let Some((target, params)) = part.split_once(';') else {
            continue;
        };
        if !params.contains(r#"rel="next""#) {
            continue;
        }
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let url = Url::parse(target).ok()?;
        return url.query_pairs().find_map(|(key, value)| {
            if key == "page" { value.parse().ok() } else { None }
        });
    }
    None
}
