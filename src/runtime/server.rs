//! Standalone HTTP server.

use crate::app::{Application, Responder};
use crate::error::BoxError;
use crate::http::{Body, Method, Request, RequestContext, Response, StatusCode};
use crate::runtime::{CompletionSignal, Server};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, LengthLimitError, Limited, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn, Instrument};

type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

/// HTTP/1 server that dispatches every request to the shared responder.
///
/// Streamed response bodies are written to the socket as they are produced.
pub struct HttpServer<R: Responder = Application> {
    bind_addr: String,
    max_body_size: usize,
    responder: Arc<R>,
    signal: CompletionSignal,
    local_addr: OnceLock<SocketAddr>,
}

impl<R: Responder> HttpServer<R> {
    pub fn new(bind_addr: impl Into<String>, max_body_size: usize, responder: Arc<R>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            max_body_size,
            responder,
            signal: CompletionSignal::new(),
            local_addr: OnceLock::new(),
        }
    }
}

#[async_trait]
impl<R: Responder> Server for HttpServer<R> {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn start(&self) -> io::Result<()> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        let addr = listener.local_addr()?;
        let _ = self.local_addr.set(addr);

        info!("Server listening on {}", addr);

        tokio::spawn(accept_loop(
            listener,
            self.responder.clone(),
            self.max_body_size,
            self.signal.clone(),
        ));
        Ok(())
    }

    fn shutdown(&self) {
        if self.signal.complete() {
            info!("Server shutting down");
        }
    }

    fn on_shutdown(&self) -> CompletionSignal {
        self.signal.clone()
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }
}

impl<R: Responder> Drop for HttpServer<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn accept_loop<R: Responder>(
    listener: TcpListener,
    responder: Arc<R>,
    max_body_size: usize,
    signal: CompletionSignal,
) {
    loop {
        let (stream, remote_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            },
            _ = signal.wait() => break,
        };
        let io = TokioIo::new(stream);
        let responder = responder.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let responder = responder.clone();
                async move { handle_request(req, responder, max_body_size, remote_addr).await }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
    info!("Server stopped accepting connections");
}

/// Handle an incoming HTTP request.
async fn handle_request<R: Responder>(
    req: hyper::Request<Incoming>,
    responder: Arc<R>,
    max_body_size: usize,
    remote_addr: SocketAddr,
) -> Result<hyper::Response<ResponseBody>, Infallible> {
    let request_id = generate_request_id();

    debug!(
        "Handling request: {} {} from {} [{}]",
        req.method(),
        req.uri(),
        remote_addr,
        request_id
    );

    let request = match convert_request(req, max_body_size, request_id.clone()).await {
        Ok(request) => request,
        Err(response) => return Ok(build_response(response)),
    };

    let span = request.context.span.clone();
    match responder.respond(request).instrument(span).await {
        Ok(response) => Ok(build_response(response)),
        Err(e) => {
            error!("Dispatch failed: {} [{}]", e, request_id);
            Ok(build_response(Response::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
            )))
        }
    }
}

/// Convert a hyper request to a generic request, or an error response.
async fn convert_request(
    req: hyper::Request<Incoming>,
    max_body_size: usize,
    request_id: String,
) -> Result<Request, Response> {
    let method = Method::from(req.method());
    let url = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut request = Request::new(method, url).with_context(RequestContext::new(request_id));
    for (name, value) in req.headers() {
        match value.to_str() {
            Ok(v) => request.headers.append(name.as_str(), v),
            Err(_) => warn!("Dropping non-ASCII value of header {}", name),
        }
    }

    // Stops reading as soon as the limit is crossed.
    let body_bytes = Limited::new(req.into_body(), max_body_size)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                Response::error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
            } else {
                Response::error(StatusCode::BAD_REQUEST, e.to_string())
            }
        })?
        .to_bytes();
    if !body_bytes.is_empty() {
        request.body = Some(body_bytes);
    }

    Ok(request)
}

/// Build a hyper response from a generic response.
fn build_response(response: Response) -> hyper::Response<ResponseBody> {
    let status = hyper::StatusCode::from_u16(response.status.0).unwrap_or_else(|_| {
        warn!(
            "Invalid status code {}, falling back to 500 Internal Server Error",
            response.status.0
        );
        hyper::StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut builder = hyper::Response::builder().status(status);
    for (name, value) in response.headers {
        builder = builder.header(name, value);
    }

    let body = match response.body {
        Body::Empty => Empty::<Bytes>::new()
            .map_err(|never| match never {})
            .boxed_unsync(),
        Body::Text(text) => full(Bytes::from(text)),
        Body::Bytes(bytes) => full(bytes),
        Body::Stream(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
    };

    builder.body(body).unwrap_or_else(|e| {
        error!("Failed to build response: {}", e);
        let mut fallback = hyper::Response::new(full(Bytes::from_static(b"Internal Server Error")));
        *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

fn full(bytes: Bytes) -> ResponseBody {
    Full::new(bytes).map_err(|never| match never {}).boxed_unsync()
}

/// Generate a unique request ID.
fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{:x}", timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::HttpError;
    use crate::error::DispatchError;
    use futures::stream;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn app() -> Arc<Application> {
        let mut app = Application::new();
        app.post("/echo", |req: Request| async move {
            Ok::<_, HttpError>(Response::text(req.text().unwrap_or_default()))
        })
        .get("/stream", |_req: Request| async move {
            let chunks: Vec<Result<Bytes, BoxError>> =
                vec![Ok(Bytes::from_static(b"one,")), Ok(Bytes::from_static(b"two"))];
            Ok::<_, HttpError>(Response::ok().body(Body::stream(stream::iter(chunks))))
        });
        Arc::new(app)
    }

    async fn send(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_serves_and_stops() {
        let server = HttpServer::new("127.0.0.1:0", 1024, app());
        server.start().await.unwrap();
        let addr = server.local_addr().unwrap();

        let out = send(
            addr,
            "POST /echo HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 200"));
        assert!(out.ends_with("hello"));

        let signal = server.on_shutdown();
        server.shutdown();
        server.shutdown();
        assert!(signal.is_complete());
    }

    #[tokio::test]
    async fn test_streamed_body() {
        let server = HttpServer::new("127.0.0.1:0", 1024, app());
        server.start().await.unwrap();

        let out = send(
            server.local_addr().unwrap(),
            "GET /stream HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 200"));
        assert!(out.contains("one,"));
        assert!(out.contains("two"));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let server = HttpServer::new("127.0.0.1:0", 4, app());
        server.start().await.unwrap();

        let out = send(
            server.local_addr().unwrap(),
            "POST /echo HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 413"));
    }

    #[tokio::test]
    async fn test_body_limit_rejects_before_body_arrives() {
        let server = HttpServer::new("127.0.0.1:0", 4, app());
        server.start().await.unwrap();

        // Declares far more than is ever sent; the reply must not wait for it.
        let out = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            send(
                server.local_addr().unwrap(),
                "POST /echo HTTP/1.1\r\nHost: x\r\nContent-Length: 1073741824\r\nConnection: close\r\n\r\nabcdefgh",
            ),
        )
        .await
        .unwrap();
        assert!(out.starts_with("HTTP/1.1 413"));
    }

    #[tokio::test]
    async fn test_body_limit_applies_to_chunked_bodies() {
        let server = HttpServer::new("127.0.0.1:0", 4, app());
        server.start().await.unwrap();

        let out = send(
            server.local_addr().unwrap(),
            "POST /echo HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n3\r\nabc\r\n3\r\ndef\r\n0\r\n\r\n",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 413"));
    }

    /// Answers with the name and id of the span it runs under.
    struct SpanEcho;

    #[async_trait]
    impl Responder for SpanEcho {
        async fn respond(&self, request: Request) -> Result<Response, DispatchError> {
            let current = tracing::Span::current();
            let name = current.metadata().map(|m| m.name()).unwrap_or("none");
            let same = current.id().is_some() && current.id() == request.context.span.id();
            Ok(Response::text(format!("{} {}", name, same)))
        }
    }

    #[tokio::test]
    async fn test_responder_runs_in_request_span() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let server = HttpServer::new("127.0.0.1:0", 1024, Arc::new(SpanEcho));
        server.start().await.unwrap();

        let out = send(
            server.local_addr().unwrap(),
            "GET /anything HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 200"));
        assert!(out.ends_with("request true"));
    }

    #[test]
    fn test_build_response_keeps_duplicate_headers() {
        let response = build_response(
            Response::ok()
                .header("Set-Cookie", "a=1")
                .header("Set-Cookie", "b=2"),
        );
        assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);
    }

    #[test]
    fn test_invalid_status_falls_back() {
        let response = build_response(Response::new(StatusCode(1000)));
        assert_eq!(response.status(), hyper::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
