//! API Gateway HTTP API (payload format 2.0) envelopes.

use super::{body, headers, null_as_default};
use crate::error::{DecodeError, StreamCollectionError};
use crate::http::{Method, Request, RequestContext, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Incoming V2 invocation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayV2Request {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub route_key: Option<String>,
    pub raw_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_query_string: String,
    #[serde(default)]
    pub cookies: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub query_string_parameters: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub path_parameters: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stage_variables: HashMap<String, String>,
    pub request_context: ApiGatewayV2RequestContext,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayV2RequestContext {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub api_id: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub time_epoch: Option<i64>,
    pub http: ApiGatewayV2Http,
}

/// `requestContext.http`; the only place V2 carries the method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayV2Http {
    pub method: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl ApiGatewayV2Request {
    /// Build a generic request, keeping this event as its origin.
    pub fn into_request(self, context: RequestContext) -> Result<Request, DecodeError> {
        let method = Method::from(self.request_context.http.method.as_str());
        let body = body::decode(self.body.as_deref(), self.is_base64_encoded)?;
        let headers = headers::from_v2(&self.headers, self.cookies.as_deref());

        let mut url = self.raw_path.clone();
        if !self.raw_query_string.is_empty() {
            url.push('?');
            url.push_str(&self.raw_query_string);
        }

        let mut request = Request::new(method, url).with_context(context);
        request.headers = headers;
        request.body = body;
        Ok(request.with_origin(super::OriginEvent::V2(self)))
    }
}

/// Outgoing V2 invocation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayV2Response {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub is_base64_encoded: bool,
}

impl ApiGatewayV2Response {
    pub async fn from_response(response: Response) -> Result<Self, StreamCollectionError> {
        let headers = headers::to_joined(&response.headers);
        let encoded = body::encode_body(response.body).await?;
        let is_base64_encoded = encoded.as_ref().is_some_and(|e| e.is_base64_encoded);

        Ok(Self {
            status_code: response.status.0,
            headers,
            body: encoded.map(|e| e.body),
            is_base64_encoded,
        })
    }
}
