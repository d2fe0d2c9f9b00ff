//! HTTP surface of the bridge.
//!
//! One business route, `/dns` (GET and POST, both reading a JSON body),
//! receives desired record state and hands it to the
//! [`Reconciler`](mikrodns_core::Reconciler); `/readiness` and `/liveness`
//! are constant-response orchestrator probes.

pub mod handlers;
pub mod routes;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::TcpListener;
use tracing::info;

use mikrodns_core::error::Result;
use mikrodns_core::reconciler::Reconciler;

/// Default listen address of the webhook endpoint
pub const DEFAULT_BIND: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8088);

/// The webhook HTTP server
pub struct ApiServer {
    reconciler: Reconciler,
    bind: SocketAddr,
}

impl ApiServer {
    /// Serve the given reconciler on the default address
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            reconciler,
            bind: DEFAULT_BIND,
        }
    }

    /// Override the listen address
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Bind and serve until the shutdown future resolves
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let listener = TcpListener::bind(self.bind).await?;
        info!("listening on {}", listener.local_addr()?);

        let app = routes::router(self.reconciler);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
