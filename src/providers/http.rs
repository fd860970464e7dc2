//! HTTP service provider for dependency injection.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::info;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{
    app_context::AppState, interface, providers::traits::ServiceProvider,
    task_manager::TaskManager,
};

/// HTTP service provider exposing the display endpoints.
///
/// The listener is bound when the provider is created so that an
/// unavailable address aborts startup instead of failing later inside a
/// background task.
///
/// # Priority and Criticality
///
/// - **Priority**: 8
/// - **Critical**: Yes (the daemon has no other interface)
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use mirror_displayd::providers::HttpServiceProvider;
/// use mirror_displayd::app_context::AppState;
///
/// # async fn example(state: Arc<AppState>) -> anyhow::Result<()> {
/// let provider = HttpServiceProvider::new(state).await?;
/// println!("listening on {}", provider.local_addr());
/// # Ok(())
/// # }
/// ```
pub struct HttpServiceProvider {
    state: Arc<AppState>,
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
}

impl HttpServiceProvider {
    /// Binds the configured listen address.
    pub async fn new(state: Arc<AppState>) -> Result<Self> {
        let addr = state.config.listen;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {addr}"))?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            state,
            listener: Mutex::new(Some(listener)),
            local_addr,
        })
    }

    /// Address the listener is bound to.
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl ServiceProvider for HttpServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        let listener = {
            let mut slot = self
                .listener
                .lock()
                .map_err(|_| anyhow!("HTTP listener lock poisoned"))?;
            slot.take()
        }
        .ok_or_else(|| anyhow!("HTTP service already started"))?;
        let state = self.state.clone();

        task_manager.spawn_task(self.name().to_string(), |cancel_token| async move {
            run_http_service(listener, state, cancel_token).await
        })
    }

    fn name(&self) -> &'static str {
        "HttpService"
    }

    fn priority(&self) -> i32 {
        8
    }

    fn is_critical(&self) -> bool {
        true
    }
}

/// Serves the HTTP interface until cancellation is requested.
async fn run_http_service(
    listener: TcpListener,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("HTTP interface listening on {}", listener.local_addr()?);

    axum::serve(listener, interface::router(state.as_ref().clone()))
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await
        .context("HTTP server failed")?;

    info!("HTTP service stopped");
    Ok(())
}
