//! Generic HTTP request handed to the application.

use crate::gateway::{v1::ApiGatewayRequest, v2::ApiGatewayV2Request, OriginEvent};
use crate::http::HeaderList;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// HTTP method enumeration.
///
/// Methods outside the standard set (WebDAV's `PROPFIND`, `MKCOL`, ...) are
/// carried verbatim in [`Method::Other`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Connect,
    Trace,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
            Method::Other(method) => method,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "PATCH" => Method::Patch,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "CONNECT" => Method::Connect,
            "TRACE" => Method::Trace,
            _ => Method::Other(s.to_string()),
        }
    }
}

impl From<String> for Method {
    fn from(s: String) -> Self {
        Method::from(s.as_str())
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.as_str().to_string()
    }
}

impl FromStr for Method {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Method::from(s))
    }
}

impl From<&hyper::Method> for Method {
    fn from(method: &hyper::Method) -> Self {
        Method::from(method.as_str())
    }
}

/// Per-invocation correlation data: deadline, trace id and a logging span.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Platform request id, or a generated one in standalone mode.
    pub request_id: String,
    /// Wall-clock time by which the invocation must complete.
    pub deadline: Option<SystemTime>,
    pub trace_id: Option<String>,
    /// Span that handler logs should be recorded under.
    pub span: tracing::Span,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        let span = tracing::info_span!("request", request_id = %request_id);
        Self {
            request_id,
            deadline: None,
            trace_id: None,
            span,
        }
    }

    /// Time left before the deadline, if one is known.
    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.duration_since(SystemTime::now()).unwrap_or(Duration::ZERO))
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            request_id: String::new(),
            deadline: None,
            trace_id: None,
            span: tracing::Span::none(),
        }
    }
}

/// Generic HTTP request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: Method,
    /// Path plus optional `?query`.
    pub url: String,
    pub headers: HeaderList,
    pub body: Option<Bytes>,
    pub context: RequestContext,
    params: HashMap<String, String>,
    origin: Option<Arc<OriginEvent>>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Append a header to the request.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub(crate) fn with_origin(mut self, origin: OriginEvent) -> Self {
        self.origin = Some(Arc::new(origin));
        self
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// First value of a header.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// URL path without the query string.
    pub fn path(&self) -> &str {
        self.url.split_once('?').map_or(self.url.as_str(), |(p, _)| p)
    }

    /// Raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, q)| q)
    }

    /// Value of a `:name` route parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Get the body as text if present.
    pub fn text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).to_string())
    }

    /// Parse the body as JSON if present.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.body.as_ref().map(|b| serde_json::from_slice(b))
    }

    /// Envelope this request was decoded from. `None` in standalone mode.
    pub fn origin_event(&self) -> Option<&OriginEvent> {
        self.origin.as_deref()
    }

    /// Source event when the request arrived as an API Gateway V1 envelope.
    pub fn api_gateway_request(&self) -> Option<&ApiGatewayRequest> {
        match self.origin_event()? {
            OriginEvent::V1(event) => Some(event),
            OriginEvent::V2(_) => None,
        }
    }

    /// Source event when the request arrived as an API Gateway V2 envelope.
    pub fn api_gateway_v2_request(&self) -> Option<&ApiGatewayV2Request> {
        match self.origin_event()? {
            OriginEvent::V2(event) => Some(event),
            OriginEvent::V1(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!(
            "PROPFIND".parse::<Method>().unwrap(),
            Method::Other("PROPFIND".into())
        );
    }

    #[test]
    fn test_extension_method_kept_verbatim() {
        let method = Method::from("mkcol");
        assert_eq!(method, Method::Other("mkcol".into()));
        assert_eq!(method.to_string(), "mkcol");
        assert_eq!(Method::from(&hyper::Method::PATCH), Method::Patch);

        let json = serde_json::to_string(&Method::Other("PROPFIND".into())).unwrap();
        assert_eq!(json, "\"PROPFIND\"");
        assert_eq!(serde_json::from_str::<Method>("\"delete\"").unwrap(), Method::Delete);
    }

    #[test]
    fn test_path_and_query_split() {
        let request = Request::new(Method::Get, "/items?page=2&sort=asc");
        assert_eq!(request.path(), "/items");
        assert_eq!(request.query(), Some("page=2&sort=asc"));

        let request = Request::new(Method::Get, "/items");
        assert_eq!(request.path(), "/items");
        assert_eq!(request.query(), None);
    }

    #[test]
    fn test_remaining_time_saturates() {
        let mut ctx = RequestContext::new("req-1");
        assert_eq!(ctx.remaining_time(), None);

        ctx.deadline = Some(SystemTime::now() - Duration::from_secs(5));
        assert_eq!(ctx.remaining_time(), Some(Duration::ZERO));
    }
}
