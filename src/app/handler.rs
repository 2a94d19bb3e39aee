//! Route handlers and the application lifecycle hooks.

use crate::app::Application;
use crate::error::BoxError;
use crate::http::{Request, Response};
use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;

/// Handles requests for one route.
///
/// Implemented for any `Fn(Request) -> impl Future<Output = Result<Response, HttpError>>`.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn call(&self, request: Request) -> Result<Response, HttpError>;
}

#[async_trait]
impl<F, Fut> RouteHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, HttpError>> + Send + 'static,
{
    async fn call(&self, request: Request) -> Result<Response, HttpError> {
        (self)(request).await
    }
}

/// Error returned by a route handler. Rendered as an error response.
#[derive(Error, Debug, Clone)]
#[error("[{code}] {message}")]
pub struct HttpError {
    pub message: String,
    pub code: u16,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 500,
        }
    }

    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code(404, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code(400, message)
    }
}

impl From<HttpError> for Response {
    fn from(err: HttpError) -> Self {
        Response::error(err.code, err.message)
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::bad_request(err.to_string())
    }
}

/// An application that can be served from any operating mode.
///
/// The hooks run once per process (standalone) or once per cold start
/// (gateway modes):
///
/// 1. `bootstrap`: process-wide globals, before anything else.
/// 2. `init`: build the application's own state.
/// 3. `configure`, then `add_routes`: set up the shared [`Application`].
/// 4. `deconfigure`: runs once when the process is told to stop.
#[async_trait]
pub trait LambdaApp: Send + Sync + Sized + 'static {
    async fn init(app: &Application) -> Result<Self, BoxError>;

    /// Process-wide setup such as telemetry or metrics exporters.
    async fn bootstrap() -> Result<(), BoxError> {
        Ok(())
    }

    async fn configure(&self, _app: &mut Application) -> Result<(), BoxError> {
        Ok(())
    }

    async fn add_routes(&self, app: &mut Application) -> Result<(), BoxError>;

    async fn deconfigure(&self, _app: &Application) -> Result<(), BoxError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusCode;

    /// Implements only the required hooks.
    struct Minimal;

    #[async_trait]
    impl LambdaApp for Minimal {
        async fn init(_app: &Application) -> Result<Self, BoxError> {
            Ok(Minimal)
        }

        async fn add_routes(&self, app: &mut Application) -> Result<(), BoxError> {
            app.get("/", |_req: Request| async move { Ok::<_, HttpError>(Response::text("up")) });
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_hooks_succeed() {
        let mut app = Application::new();
        Minimal::bootstrap().await.unwrap();
        let minimal = Minimal::init(&app).await.unwrap();
        minimal.configure(&mut app).await.unwrap();
        minimal.add_routes(&mut app).await.unwrap();
        minimal.deconfigure(&app).await.unwrap();
    }

    #[test]
    fn test_http_error_into_response() {
        let response = Response::from(HttpError::not_found("no such user"));
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
