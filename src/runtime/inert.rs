//! Server abstraction and the inert stand-in used in gateway modes.

use crate::runtime::CompletionSignal;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tracing::debug;

/// Something that serves the application while the process is running.
#[async_trait]
pub trait Server: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn start(&self) -> io::Result<()>;

    /// Stop serving and resolve the completion signal. Safe to call repeatedly.
    fn shutdown(&self);

    /// Signal that resolves once the server has shut down.
    fn on_shutdown(&self) -> CompletionSignal;

    /// Bound socket address, if the server has one.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Server that never opens a socket.
///
/// Gateway modes receive traffic as invocation events, but the process still
/// needs a running server for its lifecycle. Dropping it resolves the signal
/// as well.
#[derive(Debug, Default)]
pub struct InertServer {
    signal: CompletionSignal,
}

impl InertServer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Server for InertServer {
    fn name(&self) -> &'static str {
        "inert"
    }

    async fn start(&self) -> io::Result<()> {
        Ok(())
    }

    fn shutdown(&self) {
        if self.signal.complete() {
            debug!("Inert server shut down");
        }
    }

    fn on_shutdown(&self) -> CompletionSignal {
        self.signal.clone()
    }
}

impl Drop for InertServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
