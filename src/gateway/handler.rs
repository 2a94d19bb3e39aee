//! Per-invocation path: decode, dispatch, encode.

use crate::app::{Application, Responder};
use crate::error::InvocationError;
use crate::gateway::GatewayVersion;
use crate::http::RequestContext;
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn, Instrument};

/// Metadata the invocation platform attaches to each event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    /// Deadline in milliseconds since the Unix epoch.
    pub deadline_ms: Option<u64>,
    pub invoked_function_arn: Option<String>,
    pub trace_id: Option<String>,
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Default::default()
        }
    }

    pub fn deadline(&self) -> Option<SystemTime> {
        self.deadline_ms
            .map(|ms| UNIX_EPOCH + Duration::from_millis(ms))
    }

    /// Correlation context handed to the application with the request.
    pub fn request_context(&self) -> RequestContext {
        let span = tracing::info_span!(
            "invocation",
            request_id = %self.request_id,
            trace_id = self.trace_id.as_deref().unwrap_or(""),
        );
        RequestContext {
            request_id: self.request_id.clone(),
            deadline: self.deadline(),
            trace_id: self.trace_id.clone(),
            span,
        }
    }
}

/// Handles invocation events for one gateway version.
///
/// The responder is shared by every invocation and only read through `&self`.
pub struct GatewayHandler<R: Responder = Application> {
    version: GatewayVersion,
    responder: Arc<R>,
}

impl<R: Responder> GatewayHandler<R> {
    pub fn new(version: GatewayVersion, responder: Arc<R>) -> Self {
        Self { version, responder }
    }

    pub fn version(&self) -> GatewayVersion {
        self.version
    }

    /// Run one invocation, returning the serialized envelope response.
    ///
    /// Any failure fails this invocation only.
    pub async fn handle(
        &self,
        payload: &[u8],
        context: InvocationContext,
    ) -> Result<Bytes, InvocationError> {
        let request_context = context.request_context();
        let span = request_context.span.clone();

        let result: Result<Bytes, InvocationError> = async {
            let request = self.version.decode_request(payload, request_context)?;
            debug!("{} {}", request.method, request.url);
            let response = self.responder.respond(request).await?;
            self.version.encode_response(response).await
        }
        .instrument(span)
        .await;

        if let Err(e) = &result {
            warn!(
                "Invocation failed: {} [{}]",
                e, context.request_id
            );
        }
        result
    }
}

impl<R: Responder> Clone for GatewayHandler<R> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            responder: self.responder.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use crate::http::{Request, Response};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Echo;

    #[async_trait]
    impl Responder for Echo {
        async fn respond(&self, request: Request) -> Result<Response, DispatchError> {
            let deadline_known = request.context.deadline.is_some();
            Ok(Response::text(format!(
                "{} {} {} {}",
                request.method,
                request.url,
                request.context.request_id,
                deadline_known
            )))
        }
    }

    struct Failing;

    #[async_trait]
    impl Responder for Failing {
        async fn respond(&self, _request: Request) -> Result<Response, DispatchError> {
            Err(DispatchError::new("responder exploded"))
        }
    }

    #[tokio::test]
    async fn test_v2_roundtrip_through_responder() {
        let handler = GatewayHandler::new(GatewayVersion::V2, Arc::new(Echo));
        let payload = json!({
            "rawPath": "/echo",
            "rawQueryString": "a=b",
            "requestContext": {"http": {"method": "GET"}}
        });
        let mut context = InvocationContext::new("req-9");
        context.deadline_ms = Some(4_102_444_800_000);

        let out = handler
            .handle(payload.to_string().as_bytes(), context)
            .await
            .unwrap();
        let envelope: Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(envelope["statusCode"], 200);
        assert_eq!(envelope["body"], "GET /echo?a=b req-9 true");
        assert_eq!(envelope["isBase64Encoded"], false);
    }

    #[tokio::test]
    async fn test_dispatch_error_propagates() {
        let handler = GatewayHandler::new(GatewayVersion::V1, Arc::new(Failing));
        let payload = json!({"httpMethod": "GET", "path": "/"}).to_string();

        let err = handler
            .handle(payload.as_bytes(), InvocationContext::new("r"))
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::Dispatch(_)));
        assert_eq!(err.error_type(), "DispatchError");
    }

    #[tokio::test]
    async fn test_bad_base64_fails_before_dispatch() {
        let handler = GatewayHandler::new(GatewayVersion::V1, Arc::new(Failing));
        let payload = json!({
            "httpMethod": "POST",
            "path": "/",
            "body": "%%%",
            "isBase64Encoded": true
        })
        .to_string();

        let err = handler
            .handle(payload.as_bytes(), InvocationContext::new("r"))
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::Decode(_)));
    }
}
