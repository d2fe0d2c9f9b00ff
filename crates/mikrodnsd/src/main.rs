//! mikrodnsd - MikroTik static DNS webhook bridge daemon
//!
//! The daemon is a thin integration layer: all reconciliation logic lives in
//! `mikrodns-core`, the protocol client in `mikrodns-routeros` and the HTTP
//! surface in `mikrodns-server`. What remains here is:
//!
//! 1. Reading configuration from environment variables
//! 2. Initializing tracing
//! 3. Connecting to the router (with bounded retries) before any traffic
//!    is served
//! 4. Serving the webhook endpoint until SIGTERM/SIGINT, then releasing the
//!    router session
//!
//! ## Configuration
//!
//! - `MIKROTIK_HOST`: router address (required)
//! - `MIKROTIK_PORT`: management API port (default 8728)
//! - `MIKROTIK_USER`: login user (required)
//! - `MIKROTIK_PASS`: login password (required)
//! - `MIKROTIK_USE_SSL`: wrap the connection in TLS (default false)
//! - `MIKROTIK_SSL_VERIFY`: verify the server certificate (default false)
//! - `LOG_LEVEL`: trace|debug|info|warn|error (default info)

use std::process::ExitCode;

use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use mikrodns_core::config::RouterConfig;
use mikrodns_core::error::{Error, Result};
use mikrodns_core::reconciler::Reconciler;
use mikrodns_routeros::RouterOsSession;
use mikrodns_server::ApiServer;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum BridgeExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<BridgeExitCode> for ExitCode {
    fn from(code: BridgeExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Configuration problems are reported on stderr and stop the process
    // before the listener is bound.
    let config = match RouterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return BridgeExitCode::ConfigError.into();
        }
    };

    let log_level = match log_level_from_env() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return BridgeExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return BridgeExitCode::ConfigError.into();
    }

    info!("starting mikrodnsd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {e}");
            return BridgeExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(config)).into()
}

async fn run(config: RouterConfig) -> BridgeExitCode {
    // The bridge must not serve traffic without a working upstream session.
    let session = match connect_with_retry(&config).await {
        Ok(session) => session,
        Err(e) => {
            error!("failed to connect to the router: {e}");
            return BridgeExitCode::ConfigError;
        }
    };

    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            error!("failed to install signal handlers: {e}");
            return BridgeExitCode::RuntimeError;
        }
    };

    let reconciler = Reconciler::new(Box::new(session));
    let server = ApiServer::new(reconciler.clone());

    if let Err(e) = server.serve(shutdown).await {
        error!("server error: {e}");
        return BridgeExitCode::RuntimeError;
    }

    if let Err(e) = reconciler.close().await {
        warn!("closing the router session failed: {e}");
    }

    info!("shutdown complete");
    BridgeExitCode::CleanShutdown
}

/// Connect to the router, retrying with a fixed delay up to the configured
/// bound. Exhausting the attempts fails startup.
async fn connect_with_retry(config: &RouterConfig) -> Result<RouterOsSession> {
    let mut last_error = None;

    for attempt in 1..=config.connect_max_retries {
        match RouterOsSession::connect(config.clone()).await {
            Ok(session) => return Ok(session),
            Err(e) => {
                warn!(
                    "connection attempt {attempt}/{} failed: {e}",
                    config.connect_max_retries
                );
                last_error = Some(e);
                if attempt < config.connect_max_retries {
                    tokio::time::sleep(config.connect_retry_delay()).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::connection("no connection attempts were made")))
}

/// `LOG_LEVEL` mapped to a tracing level; unset means info
fn log_level_from_env() -> Result<Level> {
    match std::env::var("LOG_LEVEL") {
        Err(_) => Ok(Level::INFO),
        Ok(raw) => match raw.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => Err(Error::config(format!(
                "environment variable LOG_LEVEL has invalid value: {raw}"
            ))),
        },
    }
}

/// Resolve on SIGTERM or SIGINT
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()> + Send + 'static> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(async move {
        let received = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("received {received}, shutting down");
    })
}

/// Resolve on ctrl-c (fallback for non-Unix platforms)
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()> + Send + 'static> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to wait for ctrl-c: {e}");
        }
        info!("received ctrl-c, shutting down");
    })
}
