//! Application assembly and lifecycle.

use crate::cache::LocationCache;
use crate::config::Config;
use crate::github::GithubApi;
use crate::refresh::RefreshService;
use crate::state::{AppState, ServiceStatus, ServiceStatusRegistry};
use crate::web;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tracing::info;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Main application struct containing all necessary components.
pub struct App {
    config: Arc<Config>,
    state: AppState,
    refresh: RefreshService,
}

impl App {
    /// Create a new App instance with all components wired together.
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let cache = Arc::new(LocationCache::new(config.cache_ttl()));
        let github = Arc::new(
            GithubApi::new(
                &config.github_api_url,
                config.github_api_key.as_deref(),
                config.per_page,
            )
            .context("failed to create GitHub client")?,
        );
        let probe = reqwest::Client::builder()
            .user_agent(concat!("gofetch/", env!("CARGO_PKG_VERSION")))
            .timeout(PROBE_TIMEOUT)
            .build()
            .context("failed to create probe client")?;

        let service_statuses = ServiceStatusRegistry::new();
        service_statuses.set("refresh", ServiceStatus::Starting);
        service_statuses.set("web", ServiceStatus::Starting);

        let state = AppState {
            config: config.clone(),
            cache: cache.clone(),
            github: github.clone(),
            probe,
            service_statuses: service_statuses.clone(),
        };
        let refresh = RefreshService::new(
            config.orgs.clone(),
            github,
            cache,
            config.refresh_interval(),
            service_statuses,
        );

        Ok(App {
            config,
            state,
            refresh,
        })
    }

    /// Run the refresh service and the HTTP server until shutdown.
    ///
    /// The listener is bound only after the first refresh cycle succeeds; if
    /// that cycle fails, the error propagates and the process never accepts
    /// traffic.
    pub async fn run(self) -> Result<()> {
        let App {
            config,
            state,
            refresh,
        } = self;

        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, _) = broadcast::channel(1);

        let refresh_handle = tokio::spawn(refresh.run(ready_tx, shutdown_tx.subscribe()));

        if ready_rx.await.is_err() {
            // The refresh service dropped the ready sender without firing:
            // its initial cycle failed. Surface that error.
            let err = match refresh_handle.await {
                Ok(Err(e)) => e,
                Ok(Ok(())) => anyhow::anyhow!("refresh service exited before becoming ready"),
                Err(join_err) => anyhow::anyhow!(join_err).context("refresh service panicked"),
            };
            return Err(err.context("startup refresh failed"));
        }

        let router = web::create_router(state.clone());
        let addr = format!("0.0.0.0:{}", config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        state.service_statuses.set("web", ServiceStatus::Active);
        info!(addr = %addr, "server ready");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()))
            .await
            .context("http server error")?;

        // The signal handler already broadcast shutdown; wait for the refresh
        // loop to observe it and wind down.
        match refresh_handle.await {
            Ok(result) => result,
            Err(join_err) => Err(anyhow::anyhow!(join_err).context("refresh service panicked")),
        }
    }
}

/// Resolves once SIGINT or SIGTERM arrives, after broadcasting shutdown to
/// background services.
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received sigterm"),
    }

    let _ = shutdown_tx.send(());
}
