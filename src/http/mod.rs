//! Generic HTTP model shared by the gateway adapters and the standalone server.

mod headers;
mod request;
mod response;

pub use headers::HeaderList;
pub use request::{Method, Request, RequestContext};
pub use response::{Body, BodyStream, Response, StatusCode};
