//! Body codec: envelope body strings to bytes and back.

use crate::error::{DecodeError, StreamCollectionError};
use crate::http::Body;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;

/// Envelope body as it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub body: String,
    pub is_base64_encoded: bool,
}

/// Decode an envelope body.
///
/// `is_base64_encoded` decides whether the string is base64 or plain UTF-8
/// text; the content is never sniffed.
pub fn decode(body: Option<&str>, is_base64_encoded: bool) -> Result<Option<Bytes>, DecodeError> {
    match (body, is_base64_encoded) {
        (None, _) => Ok(None),
        (Some(body), true) => Ok(Some(Bytes::from(STANDARD.decode(body)?))),
        (Some(body), false) => Ok(Some(Bytes::copy_from_slice(body.as_bytes()))),
    }
}

/// Base64-encode raw bytes for an envelope body.
pub fn encode(bytes: &[u8]) -> EncodedBody {
    EncodedBody {
        body: STANDARD.encode(bytes),
        is_base64_encoded: true,
    }
}

/// Turn a response body into its envelope form.
///
/// In-memory text goes out as-is. In-memory bytes are base64-encoded. A
/// stream is collected in full first; if it produced nothing the envelope
/// has no body at all.
pub async fn encode_body(body: Body) -> Result<Option<EncodedBody>, StreamCollectionError> {
    match body {
        Body::Empty => Ok(None),
        Body::Text(text) => Ok(Some(EncodedBody {
            body: text,
            is_base64_encoded: false,
        })),
        Body::Bytes(bytes) => Ok(Some(encode(&bytes))),
        stream @ Body::Stream(_) => {
            let bytes = stream.collect().await?;
            if bytes.is_empty() {
                Ok(None)
            } else {
                Ok(Some(encode(&bytes)))
            }
        }
    }
}
