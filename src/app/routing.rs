//! Route table for the application.
//!
//! Maps method + path patterns to handlers. Patterns support `:param`
//! segments and a trailing `/*` wildcard.

use crate::app::RouteHandler;
use crate::http::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// HTTP method for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Any,
}

impl RouteMethod {
    /// Check if this route method accepts the given request method.
    ///
    /// Only `Any` accepts methods outside the named set.
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            RouteMethod::Any => true,
            RouteMethod::Get => *method == Method::Get,
            RouteMethod::Post => *method == Method::Post,
            RouteMethod::Put => *method == Method::Put,
            RouteMethod::Delete => *method == Method::Delete,
            RouteMethod::Patch => *method == Method::Patch,
            RouteMethod::Head => *method == Method::Head,
            RouteMethod::Options => *method == Method::Options,
        }
    }
}

impl From<&str> for RouteMethod {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => RouteMethod::Get,
            "POST" => RouteMethod::Post,
            "PUT" => RouteMethod::Put,
            "DELETE" => RouteMethod::Delete,
            "PATCH" => RouteMethod::Patch,
            "HEAD" => RouteMethod::Head,
            "OPTIONS" => RouteMethod::Options,
            "*" | "ANY" => RouteMethod::Any,
            _ => RouteMethod::Get,
        }
    }
}

/// A route entry that maps a path pattern to a handler.
#[derive(Clone)]
pub struct Route {
    /// Route path pattern (e.g., "/api/users/:id").
    pub path: String,
    pub method: RouteMethod,
    /// Route priority (higher = more priority).
    pub priority: u32,
    handler: Arc<dyn RouteHandler>,
}

impl Route {
    pub fn new(
        method: impl Into<RouteMethod>,
        path: impl Into<String>,
        handler: impl RouteHandler + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            priority: 0,
            handler: Arc::new(handler),
        }
    }

    /// Set the route priority.
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn handler(&self) -> &Arc<dyn RouteHandler> {
        &self.handler
    }

    /// Match against a path and method, returning captured parameters.
    pub fn matches(&self, path: &str, method: &Method) -> Option<HashMap<String, String>> {
        if !self.method.matches(method) {
            return None;
        }

        if let Some(prefix) = self.path.strip_suffix("/*") {
            return path.starts_with(prefix).then(HashMap::new);
        }

        if !self.path.contains(':') {
            return (self.path == path).then(HashMap::new);
        }

        let route_segments: Vec<&str> = self.path.split('/').collect();
        let path_segments: Vec<&str> = path.split('/').collect();
        if route_segments.len() != path_segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (r, p) in route_segments.iter().zip(path_segments.iter()) {
            match r.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_string(), p.to_string());
                }
                None if r == p => {}
                None => return None,
            }
        }
        Some(params)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Route table, highest priority first. Ties keep registration order.
#[derive(Debug, Default, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, route: Route) {
        self.routes.push(route);
        self.routes.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Find a matching route and its parameters.
    pub fn find(&self, path: &str, method: &Method) -> Option<(&Route, HashMap<String, String>)> {
        self.routes
            .iter()
            .find_map(|r| r.matches(path, method).map(|params| (r, params)))
    }

    pub fn list(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
