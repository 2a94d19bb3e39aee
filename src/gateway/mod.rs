//! API Gateway envelope adapters.
//!
//! ```text
//! event JSON ──decode_request──▶ Request ──Responder──▶ Response ──encode_response──▶ response JSON
//! ```
//!
//! Each envelope version keeps its own header and body rules in its own
//! module. [`GatewayVersion`] is picked once at startup and selects which
//! pair of adapters every invocation goes through.

pub mod body;
pub mod handler;
pub mod headers;
pub mod v1;
pub mod v2;

pub use handler::{GatewayHandler, InvocationContext};

use crate::error::{DecodeError, InvocationError};
use crate::http::{Request, RequestContext, Response};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use v1::{ApiGatewayRequest, ApiGatewayResponse};
use v2::{ApiGatewayV2Request, ApiGatewayV2Response};

/// Envelope schema version spoken by the front door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayVersion {
    /// REST API, payload format 1.0.
    V1,
    /// HTTP API, payload format 2.0.
    V2,
}

impl GatewayVersion {
    /// Parse an event payload and build the generic request from it.
    pub fn decode_request(
        self,
        payload: &[u8],
        context: RequestContext,
    ) -> Result<Request, DecodeError> {
        match self {
            GatewayVersion::V1 => {
                serde_json::from_slice::<ApiGatewayRequest>(payload)?.into_request(context)
            }
            GatewayVersion::V2 => {
                serde_json::from_slice::<ApiGatewayV2Request>(payload)?.into_request(context)
            }
        }
    }

    /// Build the envelope response and serialize it.
    pub async fn encode_response(self, response: Response) -> Result<Bytes, InvocationError> {
        let encoded = match self {
            GatewayVersion::V1 => {
                let envelope = ApiGatewayResponse::from_response(response).await?;
                serde_json::to_vec(&envelope)
            }
            GatewayVersion::V2 => {
                let envelope = ApiGatewayV2Response::from_response(response).await?;
                serde_json::to_vec(&envelope)
            }
        };
        encoded.map(Bytes::from).map_err(InvocationError::Encode)
    }
}

/// The envelope a request was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub enum OriginEvent {
    V1(ApiGatewayRequest),
    V2(ApiGatewayV2Request),
}

impl OriginEvent {
    pub fn version(&self) -> GatewayVersion {
        match self {
            OriginEvent::V1(_) => GatewayVersion::V1,
            OriginEvent::V2(_) => GatewayVersion::V2,
        }
    }
}

/// Deserialize `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusCode;
    use serde_json::{json, Value};

    #[test]
    fn test_malformed_json_is_decode_error() {
        let err = GatewayVersion::V1
            .decode_request(b"{not json", RequestContext::default())
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson(_)));
    }

    #[test]
    fn test_origin_version() {
        let payload = json!({"httpMethod": "GET", "path": "/"}).to_string();
        let request = GatewayVersion::V1
            .decode_request(payload.as_bytes(), RequestContext::default())
            .unwrap();
        assert_eq!(request.origin_event().unwrap().version(), GatewayVersion::V1);
    }

    #[tokio::test]
    async fn test_same_headers_differ_by_version() {
        let build = || {
            Response::new(StatusCode::OK)
                .header("Set-Cookie", "a=1")
                .header("Set-Cookie", "b=2")
        };

        let v1: Value =
            serde_json::from_slice(&GatewayVersion::V1.encode_response(build()).await.unwrap())
                .unwrap();
        let v2: Value =
            serde_json::from_slice(&GatewayVersion::V2.encode_response(build()).await.unwrap())
                .unwrap();

        assert_eq!(v1["multiValueHeaders"], json!({"Set-Cookie": ["a=1", "b=2"]}));
        assert!(v1.get("headers").is_none());
        assert_eq!(v2["headers"], json!({"Set-Cookie": "a=1,b=2"}));
        assert!(v2.get("multiValueHeaders").is_none());
    }
}
