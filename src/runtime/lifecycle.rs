//! Lifecycle controller.
//!
//! ```text
//! Uninitialized ─bootstrap─▶ Bootstrapped ─configure─▶ Configured ─start─▶ Running
//!                                  │                                          │
//!                                  └──────(setup error)──▶ Failed          shutdown
//!                                                                             ▼
//!                                                    Terminated ◀──────── Draining
//! ```
//!
//! Transitions are serialized; the per-invocation path only reads the
//! application and never touches lifecycle state.

use crate::app::{Application, LambdaApp};
use crate::error::{BoxError, LifecycleError, SetupError, SetupStage};
use crate::gateway::GatewayHandler;
use crate::runtime::{
    init_tracing, CompletionSignal, HttpServer, InertServer, OperatingMode, RuntimeConfig, Server,
    Terminator,
};
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// Process-wide bootstrap; runs at most once no matter how many controllers exist.
static PROCESS_BOOTSTRAP: OnceCell<()> = OnceCell::const_new();

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Bootstrapped,
    Configured,
    Running,
    Draining,
    Terminated,
    /// Setup failed. No transition leaves this state.
    Failed,
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Bootstrapped => "bootstrapped",
            LifecycleState::Configured => "configured",
            LifecycleState::Running => "running",
            LifecycleState::Draining => "draining",
            LifecycleState::Terminated => "terminated",
            LifecycleState::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drives one [`LambdaApp`] through its lifecycle.
pub struct Lifecycle<A: LambdaApp> {
    config: RuntimeConfig,
    state: Mutex<LifecycleState>,
    transitions: tokio::sync::Mutex<()>,
    app: OnceLock<Arc<Application>>,
    lambda: OnceLock<A>,
    server: OnceLock<Box<dyn Server>>,
}

impl<A: LambdaApp> Lifecycle<A> {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LifecycleState::Uninitialized),
            transitions: tokio::sync::Mutex::new(()),
            app: OnceLock::new(),
            lambda: OnceLock::new(),
            server: OnceLock::new(),
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.config.mode
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, to: LifecycleState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!("Lifecycle {} -> {}", *state, to);
        *state = to;
    }

    fn expect_state(
        &self,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<(), LifecycleError> {
        let current = self.state();
        if current == from {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                from: current.name(),
                to: to.name(),
            })
        }
    }

    /// One-time process setup: logging and the application's bootstrap hook.
    pub async fn bootstrap(&self) -> Result<(), LifecycleError> {
        let _guard = self.transitions.lock().await;
        self.expect_state(LifecycleState::Uninitialized, LifecycleState::Bootstrapped)?;

        let bootstrapped = PROCESS_BOOTSTRAP
            .get_or_try_init(|| async {
                init_tracing();
                A::bootstrap().await
            })
            .await;
        if let Err(source) = bootstrapped {
            error!("Bootstrap failed: {}", source);
            self.set_state(LifecycleState::Failed);
            return Err(SetupError::new(SetupStage::Bootstrap, source).into());
        }

        self.set_state(LifecycleState::Bootstrapped);
        Ok(())
    }

    /// Build the application and run `configure` then `add_routes`.
    ///
    /// Any failure is logged, leaves the controller in `Failed`, and is
    /// returned to the caller. `add_routes` never runs if `configure` failed.
    pub async fn configure(&self) -> Result<(), LifecycleError> {
        let _guard = self.transitions.lock().await;
        self.expect_state(LifecycleState::Bootstrapped, LifecycleState::Configured)?;

        let mut app = Application::with_env(self.config.env.clone());
        let lambda = match A::init(&app).await {
            Ok(lambda) => lambda,
            Err(source) => return Err(self.setup_failed(SetupStage::Construct, source)),
        };

        if let Err(source) = lambda.configure(&mut app).await {
            self.deconfigure_after_failure(&lambda, &app).await;
            return Err(self.setup_failed(SetupStage::Configure, source));
        }
        if let Err(source) = lambda.add_routes(&mut app).await {
            self.deconfigure_after_failure(&lambda, &app).await;
            return Err(self.setup_failed(SetupStage::AddRoutes, source));
        }

        info!("Application configured with {} routes", app.router().len());
        let _ = self.app.set(Arc::new(app));
        let _ = self.lambda.set(lambda);
        self.set_state(LifecycleState::Configured);
        Ok(())
    }

    fn setup_failed(&self, stage: SetupStage, source: BoxError) -> LifecycleError {
        error!("Setup failed during {}: {}", stage, source);
        self.set_state(LifecycleState::Failed);
        SetupError::new(stage, source).into()
    }

    /// Standalone processes own their shutdown, so a half-configured
    /// application still gets its deconfigure hook.
    async fn deconfigure_after_failure(&self, lambda: &A, app: &Application) {
        if self.config.mode != OperatingMode::StandaloneServer {
            return;
        }
        if let Err(e) = lambda.deconfigure(app).await {
            error!("Deconfigure after failed setup also failed: {}", e);
        }
    }

    /// Install the server for the operating mode and register shutdown with
    /// the terminator.
    ///
    /// Standalone mode binds a socket. Gateway modes install the inert
    /// stand-in and never bind.
    pub async fn start(self: &Arc<Self>, terminator: &Terminator) -> Result<(), LifecycleError> {
        let _guard = self.transitions.lock().await;
        self.expect_state(LifecycleState::Configured, LifecycleState::Running)?;

        let app = self
            .app
            .get()
            .cloned()
            .ok_or(LifecycleError::InvalidTransition {
                from: LifecycleState::Configured.name(),
                to: LifecycleState::Running.name(),
            })?;

        let server: Box<dyn Server> = match self.config.mode {
            OperatingMode::StandaloneServer => Box::new(HttpServer::new(
                self.config.bind_addr(),
                self.config.max_body_size,
                app,
            )),
            OperatingMode::GatewayV1 | OperatingMode::GatewayV2 => Box::new(InertServer::new()),
        };
        if let Err(e) = server.start().await {
            error!("Failed to start {} server: {}", server.name(), e);
            self.set_state(LifecycleState::Failed);
            return Err(e.into());
        }
        let _ = self.server.set(server);

        let lifecycle = Arc::clone(self);
        terminator.register("application", move || async move {
            lifecycle
                .shutdown()
                .await
                .map_err(|e| Box::new(e) as BoxError)
        });

        self.set_state(LifecycleState::Running);
        info!("Running in {:?} mode", self.config.mode);
        Ok(())
    }

    /// Drain and terminate: run `deconfigure` once, then shut the server down.
    ///
    /// Calling it again after termination is a no-op.
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        let _guard = self.transitions.lock().await;
        match self.state() {
            LifecycleState::Terminated => return Ok(()),
            LifecycleState::Running => {}
            other => {
                return Err(LifecycleError::InvalidTransition {
                    from: other.name(),
                    to: LifecycleState::Draining.name(),
                })
            }
        }

        self.set_state(LifecycleState::Draining);
        info!("Draining application");
        let drained = match (self.lambda.get(), self.app.get()) {
            (Some(lambda), Some(app)) => lambda.deconfigure(app).await.map_err(|e| {
                error!("Deconfigure failed: {}", e);
                LifecycleError::Teardown(e)
            }),
            _ => Ok(()),
        };

        if let Some(server) = self.server.get() {
            server.shutdown();
        }
        self.set_state(LifecycleState::Terminated);
        info!("Application terminated");
        drained
    }

    /// Request handler for gateway modes. `None` unless running in one.
    pub fn handler(&self) -> Option<GatewayHandler> {
        if self.state() != LifecycleState::Running {
            return None;
        }
        let version = self.config.mode.gateway_version()?;
        Some(GatewayHandler::new(version, self.app.get()?.clone()))
    }

    /// The shared application, once configured.
    pub fn application(&self) -> Option<Arc<Application>> {
        self.app.get().cloned()
    }

    /// Name of the installed server, once started.
    pub fn server_name(&self) -> Option<&'static str> {
        self.server.get().map(|s| s.name())
    }

    /// Bound socket address. Always `None` in gateway modes.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.get().and_then(|s| s.local_addr())
    }

    /// The installed server's completion signal.
    pub fn on_shutdown(&self) -> Option<CompletionSignal> {
        self.server.get().map(|s| s.on_shutdown())
    }
}
