//! Application state shared between the web front end and the refresh
//! service.

use crate::cache::LocationCache;
use crate::config::Config;
use crate::github::GithubApi;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

/// Health status of a service.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Starting,
    Active,
    Error,
}

/// Thread-safe registry for services to self-report their health status.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, ServiceStatus>>,
}

impl ServiceStatusRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the status for a named service.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(name.to_owned(), status);
    }

    /// Returns a snapshot of all service statuses.
    pub fn all(&self) -> Vec<(String, ServiceStatus)> {
        self.inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// The live cache generation. The refresh service republishes it; request
    /// handlers read it and opportunistically write probe hits into it.
    pub cache: Arc<LocationCache>,
    pub github: Arc<GithubApi>,
    /// Plain client for HEAD-probing candidate repo URLs on a cache miss.
    pub probe: reqwest::Client,
    pub service_statuses: ServiceStatusRegistry,
}
