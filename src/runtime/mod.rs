//! Runtime - process lifecycle, servers and the invocation loop.

mod config;
mod host;
mod inert;
mod lifecycle;
mod server;
mod signal;
mod terminator;

pub use config::{OperatingMode, RuntimeConfig};
pub use host::{context_from_headers, ErrorReport, RuntimeClient, RESPONSE_REJECTED};
pub use inert::{InertServer, Server};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use server::HttpServer;
pub use signal::CompletionSignal;
pub use terminator::Terminator;

use crate::app::LambdaApp;
use crate::error::{ConfigError, LifecycleError};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the `info` default.
///
/// Does nothing if a subscriber is already installed.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Wait for Ctrl+C or SIGTERM (Unix).
pub async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}

/// Run `A` for the life of the process.
///
/// Standalone mode serves HTTP until a shutdown signal arrives. Gateway modes
/// poll the runtime API until it fails or a shutdown signal arrives. Either
/// way the terminator runs before returning.
pub async fn run<A: LambdaApp>(config: RuntimeConfig) -> Result<(), LifecycleError> {
    let client = match config.mode {
        OperatingMode::StandaloneServer => None,
        OperatingMode::GatewayV1 | OperatingMode::GatewayV2 => {
            let addr = config
                .runtime_api
                .as_deref()
                .ok_or(ConfigError::MissingRuntimeApi)?;
            Some(RuntimeClient::new(addr))
        }
    };

    let lifecycle = Arc::new(Lifecycle::<A>::new(config));
    let setup = match lifecycle.bootstrap().await {
        Ok(()) => lifecycle.configure().await,
        Err(e) => Err(e),
    };
    if let Err(e) = setup {
        if let (LifecycleError::Setup(setup_error), Some(client)) = (&e, &client) {
            if let Err(report_error) = client.send_init_error(setup_error).await {
                error!("Failed to report setup error: {}", report_error);
            }
        }
        return Err(e);
    }

    let terminator = Terminator::new();
    lifecycle.start(&terminator).await?;

    let outcome = match (client, lifecycle.handler()) {
        (Some(client), Some(handler)) => {
            tokio::select! {
                result = client.run(handler) => result,
                signal = shutdown_signal() => signal.map_err(LifecycleError::from),
            }
        }
        _ => shutdown_signal().await.map_err(LifecycleError::from),
    };
    info!("Shutting down");

    if let Err(e) = terminator.terminate().await {
        error!("Termination failed: {}", e);
    }
    outcome
}
