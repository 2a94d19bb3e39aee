//! API Gateway REST (payload format 1.0) envelopes.

use super::{body, headers, null_as_default};
use crate::error::{DecodeError, StreamCollectionError};
use crate::http::{Method, Request, RequestContext, Response};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Incoming V1 invocation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayRequest {
    #[serde(default)]
    pub resource: Option<String>,
    pub path: String,
    pub http_method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_string_parameters: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub multi_value_query_string_parameters: HashMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub path_parameters: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stage_variables: HashMap<String, String>,
    #[serde(default)]
    pub request_context: Option<serde_json::Value>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_base64_encoded: bool,
}

impl ApiGatewayRequest {
    /// Build a generic request, keeping this event as its origin.
    pub fn into_request(self, context: RequestContext) -> Result<Request, DecodeError> {
        let method = Method::from(self.http_method.as_str());
        let body = body::decode(self.body.as_deref(), self.is_base64_encoded)?;
        let headers = headers::from_v1(&self.headers);
        let url = match self.query_string() {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        };

        let mut request = Request::new(method, url).with_context(context);
        request.headers = headers;
        request.body = body;
        Ok(request.with_origin(super::OriginEvent::V1(self)))
    }

    /// Form-encoded query string, keys sorted. Multi-value parameters win
    /// over single-value ones when both are present.
    fn query_string(&self) -> Option<String> {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if !self.multi_value_query_string_parameters.is_empty() {
            let sorted: BTreeMap<_, _> = self.multi_value_query_string_parameters.iter().collect();
            for (key, values) in sorted {
                for value in values {
                    query.append_pair(key, value);
                }
            }
        } else if !self.query_string_parameters.is_empty() {
            let sorted: BTreeMap<_, _> = self.query_string_parameters.iter().collect();
            for (key, value) in sorted {
                query.append_pair(key, value);
            }
        }
        Some(query.finish()).filter(|q| !q.is_empty())
    }
}

/// Outgoing V1 invocation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayResponse {
    pub status_code: u16,
    pub multi_value_headers: HashMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub is_base64_encoded: bool,
}

impl ApiGatewayResponse {
    pub async fn from_response(response: Response) -> Result<Self, StreamCollectionError> {
        let multi_value_headers = headers::to_multi_value(&response.headers);
        let encoded = body::encode_body(response.body).await?;
        let is_base64_encoded = encoded.as_ref().is_some_and(|e| e.is_base64_encoded);

        Ok(Self {
            status_code: response.status.0,
            multi_value_headers,
            body: encoded.map(|e| e.body),
            is_base64_encoded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, StatusCode};
    use serde_json::json;

    fn event(value: serde_json::Value) -> ApiGatewayRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_minimal_event_with_nulls() {
        let request = event(json!({
            "httpMethod": "GET",
            "path": "/hello",
            "headers": null,
            "queryStringParameters": null,
            "body": null,
            "isBase64Encoded": false
        }))
        .into_request(RequestContext::default())
        .unwrap();

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "/hello");
        assert!(request.headers.is_empty());
        assert!(request.body.is_none());
        assert!(request.api_gateway_request().is_some());
        assert!(request.api_gateway_v2_request().is_none());
    }

    #[test]
    fn test_query_parameters_appended() {
        let request = event(json!({
            "httpMethod": "GET",
            "path": "/search",
            "multiValueQueryStringParameters": {"q": ["rust lang"], "tag": ["a", "b"]},
            "queryStringParameters": {"q": "ignored"}
        }))
        .into_request(RequestContext::default())
        .unwrap();

        assert_eq!(request.url, "/search?q=rust+lang&tag=a&tag=b");
    }

    #[test]
    fn test_base64_body_decoded() {
        let request = event(json!({
            "httpMethod": "POST",
            "path": "/upload",
            "headers": {"Content-Type": "application/octet-stream"},
            "body": "AAEC/w==",
            "isBase64Encoded": true
        }))
        .into_request(RequestContext::default())
        .unwrap();

        assert_eq!(request.body.as_deref(), Some(&[0u8, 1, 2, 255][..]));
        assert_eq!(request.get_header("content-type"), Some("application/octet-stream"));
    }

    #[test]
    fn test_extension_method_passes_through() {
        let request = event(json!({"httpMethod": "PROPFIND", "path": "/dav/notes"}))
            .into_request(RequestContext::default())
            .unwrap();
        assert_eq!(request.method, Method::Other("PROPFIND".into()));
        assert_eq!(request.url, "/dav/notes");
    }

    #[tokio::test]
    async fn test_response_multi_value_headers() {
        let response = Response::new(StatusCode::CREATED)
            .header("Set-Cookie", "a=1")
            .header("Set-Cookie", "b=2");

        let envelope = ApiGatewayResponse::from_response(response).await.unwrap();
        assert_eq!(envelope.status_code, 201);
        assert_eq!(envelope.multi_value_headers["Set-Cookie"], vec!["a=1", "b=2"]);
        assert_eq!(envelope.body, None);
        assert!(!envelope.is_base64_encoded);

        let wire = serde_json::to_value(&envelope).unwrap();
        assert!(wire.get("body").is_none());
        assert_eq!(wire["statusCode"], 201);
    }
}
