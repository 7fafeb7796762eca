// crates/fedcloud-info-server/src/server.rs
// ============================================================================
// Module: Server
// Description: Service lifecycle from configuration to serving.
// Purpose: Start background refresh tasks and serve the HTTP API.
// Dependencies: axum, tokio, tracing
// ============================================================================

//! ## Overview
//! [`Server::serve`] spawns the registry task and the VO refresh task, then
//! serves [`crate::api::router`] until Ctrl-C. Background tasks run for the
//! lifetime of the process and are not joined on shutdown.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use fedcloud_info_config::FedCloudInfoConfig;
use tokio::net::TcpListener;
use tracing::error;
use tracing::info;

use crate::api::router;
use crate::context::AppContext;
use crate::error::ServerError;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Configured service instance.
pub struct Server {
    /// Listen address.
    bind: SocketAddr,
    /// Shared collaborators.
    context: AppContext,
}

impl Server {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration is invalid or a client
    /// cannot be constructed.
    pub async fn from_config(config: &FedCloudInfoConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let context = AppContext::from_config(config).await?;
        Ok(Self {
            bind,
            context,
        })
    }

    /// Returns the shared context.
    #[must_use]
    pub const fn context(&self) -> &AppContext {
        &self.context
    }

    /// Binds the configured address and serves until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_listener(listener).await
    }

    /// Serves on an already bound listener until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when serving fails.
    pub async fn serve_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        spawn_background(&self.context);
        let addr = listener
            .local_addr()
            .map_err(|err| ServerError::Transport(format!("http listener failed: {err}")))?;
        info!(addr = %addr, "serving fedcloud info api");
        axum::serve(listener, router(self.context))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Background Tasks
// ============================================================================

/// Spawns the registry and VO catalog refresh tasks.
fn spawn_background(context: &AppContext) {
    let sites = Arc::clone(&context.sites);
    tokio::spawn(async move {
        if let Err(err) = sites.start().await {
            error!(error = %err, "site registry stopped");
        }
    });
    tokio::spawn(Arc::clone(&context.vos).run());
}

/// Resolves on Ctrl-C; never resolves when the signal cannot be installed.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
