//! # Lambda Bridge - HTTP applications on a serverless invocation platform
//!
//! Lambda Bridge runs one HTTP application either as a standalone HTTP
//! server or behind API Gateway, where every HTTP request arrives as a JSON
//! invocation event and the response leaves as a JSON envelope.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              Invocation platform  /  HTTP clients                   │
//! └─────────────────────────────────────────────────────────────────────┘
//!                 │ event JSON                        │ HTTP/1.1
//!                 ▼                                   ▼
//! ┌───────────────────────────────┐   ┌─────────────────────────────────┐
//! │ GatewayHandler (V1 / V2)      │   │ HttpServer (standalone)         │
//! │  decode ─▶ respond ─▶ encode  │   │  hyper ─▶ respond ─▶ hyper      │
//! └───────────────────────────────┘   └─────────────────────────────────┘
//!                 │                                   │
//!                 └──────────────┬────────────────────┘
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Application (router + route handlers)               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! In gateway modes no socket is ever bound: the [`runtime::InertServer`]
//! stands in for the HTTP server so the lifecycle is identical in every mode.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lambda_bridge::prelude::*;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl LambdaApp for Hello {
//!     async fn init(_app: &Application) -> Result<Self, BoxError> {
//!         Ok(Hello)
//!     }
//!
//!     async fn add_routes(&self, app: &mut Application) -> Result<(), BoxError> {
//!         app.get("/", |_req: Request| async move {
//!             Ok::<_, HttpError>(Response::text("Hello from the bridge!"))
//!         });
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = RuntimeConfig::from_env()?;
//!     lambda_bridge::runtime::run::<Hello>(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Bootstrap** (`LambdaApp::bootstrap`): once per process
//! 2. **Configure** (`init`, `configure`, `add_routes`): build the application
//! 3. **Run**: serve requests or invocations
//! 4. **Drain** (`deconfigure`): exactly once, when the terminator fires

pub mod app;
pub mod error;
pub mod gateway;
pub mod http;
pub mod runtime;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::app::{Application, HttpError, LambdaApp, Responder};
    pub use crate::error::{BoxError, DispatchError, InvocationError, LifecycleError};
    pub use crate::gateway::{GatewayHandler, GatewayVersion, InvocationContext};
    pub use crate::http::{Body, Method, Request, Response, StatusCode};
    pub use crate::runtime::{Lifecycle, OperatingMode, RuntimeConfig, Terminator};
    pub use async_trait::async_trait;
}

// Re-export for convenience
pub use app::{Application, HttpError, LambdaApp};
pub use error::{BoxError, DecodeError, DispatchError, InvocationError, LifecycleError, SetupError};
pub use gateway::{GatewayHandler, GatewayVersion};
pub use http::{Request, Response};
pub use runtime::{Lifecycle, RuntimeConfig};
