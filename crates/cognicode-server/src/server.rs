use crate::{create_router, AppState};
use cognicode_cache::spawn_expiry_sweeper;
use cognicode_core::{CogniCodeConfig, CogniCodeError, Result};
use std::net::{SocketAddr, ToSocketAddrs};
use tokio::signal;
use tracing::info;

pub struct Server {
    state: AppState,
    addr: SocketAddr,
}

impl Server {
    pub fn new(config: CogniCodeConfig) -> Result<Self> {
        let addr = resolve(&config.server.bind_address())?;
        Ok(Self::with_state(AppState::new(config), addr))
    }

    pub fn with_state(state: AppState, addr: SocketAddr) -> Self {
        Self { state, addr }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run(self) -> Result<()> {
        let sweeper = spawn_expiry_sweeper(
            self.state.cache.clone(),
            self.state.cache.config().cleanup_interval,
        );
        let cache = self.state.cache.clone();
        let pool = self.state.pool.clone();
        let router = create_router(self.state);

        info!("Starting CogniCode server on {}", self.addr);

        let listener = {
            let socket = if self.addr.is_ipv6() {
                tokio::net::TcpSocket::new_v6()
            } else {
                tokio::net::TcpSocket::new_v4()
            }?;
            let _ = socket.set_reuseaddr(true);
            let _ = socket.set_keepalive(true);
            socket.bind(self.addr)?;
            socket.listen(1024)?
        };

        info!("Server listening on http://{}", self.addr);
        info!("  GET /health            - Health and pool status");
        info!("  GET /api/agents/status - Per-agent status");
        info!("  GET /ws                - Analysis session (WebSocket)");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        sweeper.abort();
        cache.clear();
        pool.shutdown();
        info!("Server stopped");
        Ok(())
    }
}

/// Accepts host names as well as literal addresses.
fn resolve(bind_address: &str) -> Result<SocketAddr> {
    bind_address.to_socket_addrs()?.next().ok_or_else(|| {
        CogniCodeError::Validation(format!("bind address {} did not resolve", bind_address))
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
