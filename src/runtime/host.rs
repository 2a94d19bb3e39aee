//! Client for the invocation platform's runtime API.
//!
//! ```text
//! GET  /2018-06-01/runtime/invocation/next          → event + context headers
//! POST /2018-06-01/runtime/invocation/{id}/response ← envelope response
//! POST /2018-06-01/runtime/invocation/{id}/error    ← {errorMessage, errorType}
//! POST /2018-06-01/runtime/init/error               ← setup failure
//! ```
//!
//! Failed calls are reported, never retried.

use crate::app::Responder;
use crate::error::{LifecycleError, SetupError};
use crate::gateway::{GatewayHandler, InvocationContext};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::HeaderMap;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const API_VERSION: &str = "2018-06-01";

const REQUEST_ID_HEADER: &str = "lambda-runtime-aws-request-id";
const DEADLINE_HEADER: &str = "lambda-runtime-deadline-ms";
const FUNCTION_ARN_HEADER: &str = "lambda-runtime-invoked-function-arn";
const TRACE_ID_HEADER: &str = "lambda-runtime-trace-id";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

/// Error type reported when the runtime API refuses an invocation's response.
pub const RESPONSE_REJECTED: &str = "ResponseRejected";

/// Error document posted to the runtime API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub error_message: String,
    pub error_type: String,
}

/// HTTP client bound to one runtime API address.
pub struct RuntimeClient {
    base: String,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl RuntimeClient {
    /// `addr` is the `host:port` from `AWS_LAMBDA_RUNTIME_API`.
    pub fn new(addr: impl AsRef<str>) -> Self {
        Self {
            base: format!("http://{}/{}/runtime", addr.as_ref(), API_VERSION),
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    /// Long-poll for the next invocation event.
    pub async fn next_invocation(&self) -> Result<(InvocationContext, Bytes), LifecycleError> {
        let request = hyper::Request::get(format!("{}/invocation/next", self.base))
            .body(Full::new(Bytes::new()))
            .map_err(runtime_error)?;
        let response = self.client.request(request).await.map_err(runtime_error)?;

        if !response.status().is_success() {
            return Err(LifecycleError::Runtime(format!(
                "next invocation returned {}",
                response.status()
            )));
        }

        let context = context_from_headers(response.headers())?;
        let payload = response
            .into_body()
            .collect()
            .await
            .map_err(runtime_error)?
            .to_bytes();
        Ok((context, payload))
    }

    pub async fn send_response(&self, request_id: &str, body: Bytes) -> Result<(), LifecycleError> {
        self.post(&format!("invocation/{}/response", request_id), body, None)
            .await
    }

    pub async fn send_error(
        &self,
        request_id: &str,
        report: &ErrorReport,
    ) -> Result<(), LifecycleError> {
        let body = serde_json::to_vec(report).map_err(runtime_error)?;
        self.post(
            &format!("invocation/{}/error", request_id),
            Bytes::from(body),
            Some(report.error_type.as_str()),
        )
        .await
    }

    pub async fn send_init_error(&self, error: &SetupError) -> Result<(), LifecycleError> {
        let report = ErrorReport {
            error_message: error.to_string(),
            error_type: "SetupError".to_string(),
        };
        let body = serde_json::to_vec(&report).map_err(runtime_error)?;
        self.post("init/error", Bytes::from(body), Some(report.error_type.as_str()))
            .await
    }

    async fn post(
        &self,
        path: &str,
        body: Bytes,
        error_type: Option<&str>,
    ) -> Result<(), LifecycleError> {
        let mut builder = hyper::Request::post(format!("{}/{}", self.base, path))
            .header(hyper::header::CONTENT_TYPE, "application/json");
        if let Some(error_type) = error_type {
            builder = builder.header(ERROR_TYPE_HEADER, error_type);
        }
        let request = builder.body(Full::new(body)).map_err(runtime_error)?;

        let response = self.client.request(request).await.map_err(runtime_error)?;
        if !response.status().is_success() {
            return Err(LifecycleError::Runtime(format!(
                "POST {} returned {}",
                path,
                response.status()
            )));
        }
        Ok(())
    }

    /// Serve invocations until the runtime API stops handing them out.
    ///
    /// Each invocation runs as its own task. A failed invocation is reported
    /// as an invocation error and the loop moves on. A rejected response is
    /// reported once as an invocation error; only a failed poll ends the loop.
    pub async fn run<R: Responder>(&self, handler: GatewayHandler<R>) -> Result<(), LifecycleError> {
        info!("Polling runtime API at {}", self.base);
        loop {
            let (context, payload) = self.next_invocation().await?;
            let request_id = context.request_id.clone();
            debug!("Received invocation [{}]", request_id);

            let handler = handler.clone();
            let task = tokio::spawn(async move { handler.handle(&payload, context).await });

            match task.await {
                Ok(Ok(body)) => {
                    if let Err(e) = self.send_response(&request_id, body).await {
                        error!("Response rejected: {} [{}]", e, request_id);
                        let report = ErrorReport {
                            error_message: e.to_string(),
                            error_type: RESPONSE_REJECTED.to_string(),
                        };
                        self.report_error(&request_id, &report).await;
                    }
                }
                Ok(Err(e)) => {
                    let report = ErrorReport {
                        error_message: e.to_string(),
                        error_type: e.error_type().to_string(),
                    };
                    self.report_error(&request_id, &report).await;
                }
                Err(e) => {
                    error!("Invocation task aborted: {} [{}]", e, request_id);
                    let report = ErrorReport {
                        error_message: e.to_string(),
                        error_type: "Panic".to_string(),
                    };
                    self.report_error(&request_id, &report).await;
                }
            }
        }
    }

    /// Post an invocation error, logging instead of failing the loop.
    async fn report_error(&self, request_id: &str, report: &ErrorReport) {
        if let Err(e) = self.send_error(request_id, report).await {
            error!("Failed to report invocation error: {} [{}]", e, request_id);
        }
    }
}

/// Build the invocation context from the next-invocation headers.
pub fn context_from_headers(headers: &HeaderMap) -> Result<InvocationContext, LifecycleError> {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let request_id = get(REQUEST_ID_HEADER)
        .ok_or_else(|| LifecycleError::Runtime(format!("missing {} header", REQUEST_ID_HEADER)))?;

    Ok(InvocationContext {
        request_id,
        deadline_ms: get(DEADLINE_HEADER).and_then(|v| v.parse().ok()),
        invoked_function_arn: get(FUNCTION_ARN_HEADER),
        trace_id: get(TRACE_ID_HEADER),
    })
}

fn runtime_error(e: impl std::fmt::Display) -> LifecycleError {
    LifecycleError::Runtime(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-1"));
        headers.insert(DEADLINE_HEADER, HeaderValue::from_static("1700000000000"));
        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static("Root=1-abc"));

        let context = context_from_headers(&headers).unwrap();
        assert_eq!(context.request_id, "req-1");
        assert_eq!(context.deadline_ms, Some(1_700_000_000_000));
        assert_eq!(context.trace_id.as_deref(), Some("Root=1-abc"));
        assert_eq!(context.invoked_function_arn, None);
    }

    #[test]
    fn test_missing_request_id() {
        let err = context_from_headers(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, LifecycleError::Runtime(_)));
    }

    #[test]
    fn test_error_report_wire_format() {
        let report = ErrorReport {
            error_message: "boom".into(),
            error_type: "DispatchError".into(),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"errorMessage": "boom", "errorType": "DispatchError"})
        );
    }
}
