//! Service configuration, loaded from a JSON file merged with the
//! environment.
//!
//! The file carries the deployment-stable settings (orgs, prefix,
//! overrides); raw environment variables like `PORT` override it so PaaS
//! runtimes can inject their values without touching the file.

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Json};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP front end listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Host under which vanity import paths are served, e.g.
    /// `code.example.org`.
    pub import_prefix: String,

    /// Organizations to enumerate, most preferred first: when the same
    /// repository name exists under several orgs, the earliest one wins.
    pub orgs: Vec<String>,

    /// Per-repo-name location overrides, consulted before the cache.
    #[serde(default)]
    pub overrides: HashMap<String, String>,

    /// User-agent substrings that receive go-import/go-source meta tags
    /// instead of a redirect.
    #[serde(default)]
    pub no_redirect_agents: Vec<String>,

    /// Base URL repositories live under, used to build probe targets.
    #[serde(default = "default_github_url")]
    pub github_url: String,

    /// Base URL of the REST API used for org enumeration.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Optional API token; unauthenticated listing is heavily rate limited.
    #[serde(default)]
    pub github_api_key: Option<String>,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Repositories requested per listing page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Config {
    /// Load configuration from `path`, letting select environment variables
    /// override file values.
    pub fn load(path: &Path) -> Result<Self> {
        Figment::new()
            .merge(Json::file(path))
            .merge(Env::raw().only(&["port", "log_level", "github_api_key"]))
            .extract()
            .context("failed to load config")
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_github_url() -> String {
    "https://github.com".to_owned()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_owned()
}

fn default_refresh_interval_secs() -> u64 {
    10 * 60
}

fn default_cache_ttl_secs() -> u64 {
    60 * 60
}

fn default_per_page() -> u32 {
    100
}
