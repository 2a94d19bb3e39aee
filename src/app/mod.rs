//! The application the bridge serves.
//!
//! An [`Application`] is built and configured once, then shared read-only by
//! every request. It is the default [`Responder`].

pub mod handler;
pub mod routing;

pub use handler::{HttpError, LambdaApp, RouteHandler};
pub use routing::{Route, RouteMethod, Router};

use crate::error::DispatchError;
use crate::http::{Request, Response, StatusCode};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, error};

/// Turns a request into a response. The seam the gateway adapters and the
/// standalone server dispatch through.
#[async_trait]
pub trait Responder: Send + Sync + 'static {
    async fn respond(&self, request: Request) -> Result<Response, DispatchError>;
}

/// Route table plus application-wide environment.
#[derive(Debug, Default)]
pub struct Application {
    router: Router,
    env: HashMap<String, String>,
}

impl Application {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(env: HashMap<String, String>) -> Self {
        Self {
            router: Router::new(),
            env,
        }
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn route(&mut self, route: Route) -> &mut Self {
        debug!("Registered route: {:?} {}", route.method, route.path);
        self.router.add(route);
        self
    }

    pub fn on(
        &mut self,
        method: impl Into<RouteMethod>,
        path: impl Into<String>,
        handler: impl RouteHandler + 'static,
    ) -> &mut Self {
        self.route(Route::new(method, path, handler))
    }

    pub fn get(&mut self, path: impl Into<String>, handler: impl RouteHandler + 'static) -> &mut Self {
        self.on(RouteMethod::Get, path, handler)
    }

    pub fn post(&mut self, path: impl Into<String>, handler: impl RouteHandler + 'static) -> &mut Self {
        self.on(RouteMethod::Post, path, handler)
    }

    pub fn put(&mut self, path: impl Into<String>, handler: impl RouteHandler + 'static) -> &mut Self {
        self.on(RouteMethod::Put, path, handler)
    }

    pub fn delete(&mut self, path: impl Into<String>, handler: impl RouteHandler + 'static) -> &mut Self {
        self.on(RouteMethod::Delete, path, handler)
    }
}

#[async_trait]
impl Responder for Application {
    async fn respond(&self, mut request: Request) -> Result<Response, DispatchError> {
        let method = request.method.clone();
        let path = request.path().to_string();

        let Some((route, params)) = self.router.find(&path, &method) else {
            return Ok(Response::error(
                StatusCode::NOT_FOUND,
                format!("No route for {} {}", method, path),
            ));
        };

        request.set_params(params);
        match route.handler().call(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                error!("Handler for {} {} failed: {}", method, path, e);
                Ok(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;

    fn app() -> Application {
        let mut app = Application::new();
        app.get("/users/:id", |req: Request| async move {
            let id = req.param("id").unwrap_or_default().to_string();
            Ok::<_, HttpError>(Response::text(id))
        })
        .post("/fail", |_req: Request| async move {
            Err::<Response, _>(HttpError::bad_request("nope"))
        });
        app
    }

    #[tokio::test]
    async fn test_dispatch_with_params() {
        let response = app()
            .respond(Request::new(Method::Get, "/users/42?verbose=1"))
            .await
            .unwrap();
        assert_eq!(response.text_body().as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let response = app()
            .respond(Request::new(Method::Delete, "/users/42"))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handler_error_rendered() {
        let response = app()
            .respond(Request::new(Method::Post, "/fail"))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.text_body().as_deref(), Some("nope"));
    }

    #[test]
    fn test_env() {
        let mut app = Application::new();
        app.set_env("STAGE", "test");
        assert_eq!(app.env("STAGE"), Some("test"));
        assert_eq!(app.env("MISSING"), None);
    }
}
