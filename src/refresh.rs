//! Builds cache snapshots from the org listings and keeps them fresh.
//!
//! Each cycle assembles a complete generation in a private cache and
//! publishes it with one swap, so a failed cycle leaves the live snapshot
//! untouched. The first cycle runs before readiness is signaled and a
//! failure there is fatal; once the service is ready, cycle failures only
//! log and the previous snapshot keeps serving.

use crate::cache::LocationCache;
use crate::github::{FIRST_PAGE, RepoLister};
use crate::state::{ServiceStatus, ServiceStatusRegistry};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

const SERVICE_NAME: &str = "refresh";

pub struct RefreshService {
    orgs: Vec<String>,
    lister: Arc<dyn RepoLister>,
    cache: Arc<LocationCache>,
    interval: Duration,
    statuses: ServiceStatusRegistry,
}

impl RefreshService {
    pub fn new(
        orgs: Vec<String>,
        lister: Arc<dyn RepoLister>,
        cache: Arc<LocationCache>,
        interval: Duration,
        statuses: ServiceStatusRegistry,
    ) -> Self {
        Self {
            orgs,
            lister,
            cache,
            interval,
            statuses,
        }
    }

    /// Runs the refresh loop until a shutdown signal arrives.
    ///
    /// The initial cycle completes before `ready` fires; its failure is
    /// returned to the caller and readiness is never signaled. After that,
    /// a failed cycle logs at warn, the previous snapshot keeps serving,
    /// and the next tick happens regardless.
    pub async fn run(
        self,
        ready: oneshot::Sender<()>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        if let Err(e) = self.refresh_once().await {
            self.statuses.set(SERVICE_NAME, ServiceStatus::Error);
            return Err(e).context("initial refresh cycle failed");
        }
        self.statuses.set(SERVICE_NAME, ServiceStatus::Active);
        let _ = ready.send(());
        info!("refresh service ready");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // An interval's first tick completes immediately, and the initial
        // cycle already ran. Consume it so ticks start one interval out.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.refresh_once().await {
                        Ok(()) => self.statuses.set(SERVICE_NAME, ServiceStatus::Active),
                        Err(e) => {
                            self.statuses.set(SERVICE_NAME, ServiceStatus::Error);
                            warn!(error = ?e, "refresh cycle failed, serving previous snapshot");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("refresh service received shutdown signal, exiting");
                    break;
                }
            }
        }
        Ok(())
    }

    /// One complete snapshot build: every org, every page, then a single
    /// swap. Any page error aborts the cycle with the live cache untouched.
    async fn refresh_once(&self) -> Result<()> {
        let started = time::Instant::now();
        let fresh = LocationCache::new(self.cache.ttl());

        // Orgs are walked back to front: add() overwrites unconditionally,
        // so the first-listed org lands last and wins any name collision.
        for org in self.orgs.iter().rev() {
            let mut page = Some(FIRST_PAGE);
            while let Some(current) = page {
                debug!(org, page = current, "fetching repository page");
                let batch = self
                    .lister
                    .list_page(org, current)
                    .await
                    .with_context(|| format!("listing repos for org {org} (page {current})"))?;

                for repo in batch.repos {
                    let Some(name) = repo.name.as_deref().filter(|name| !name.is_empty())
                    else {
                        continue;
                    };
                    fresh.add(name, repo.html_url.as_deref().unwrap_or_default());
                }
                page = batch.next_page;
            }
        }

        self.cache.swap(&fresh);
        info!(
            orgs = self.orgs.len(),
            entries = self.cache.len(),
            elapsed = ?started.elapsed(),
            "cache refreshed"
        );
        Ok(())
    }
}
