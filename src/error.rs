//! Error types for the bridge.
//!
//! Per-invocation errors ([`InvocationError`] and the errors it wraps) only
//! ever fail the invocation that produced them. [`SetupError`] is the one
//! error that aborts the whole process.

use std::fmt;
use thiserror::Error;

/// Boxed error used at the seams where user code plugs in.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An invocation event could not be turned into a request.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The body was flagged `isBase64Encoded` but is not valid base64.
    #[error("invalid base64 body: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// The event payload is not a valid envelope document.
    #[error("invalid event payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// The responder failed to produce a response.
#[derive(Error, Debug)]
#[error("dispatch failed: {message}")]
pub struct DispatchError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl DispatchError {
    /// Create a dispatch error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a dispatch error wrapping an underlying failure.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// A streamed response body ended abnormally while being collected.
#[derive(Error, Debug)]
#[error("response stream failed after {collected} bytes: {source}")]
pub struct StreamCollectionError {
    /// Bytes collected before the failure. The buffer itself is discarded.
    pub collected: usize,
    #[source]
    pub source: BoxError,
}

/// Failure of a single invocation.
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    StreamCollection(#[from] StreamCollectionError),

    /// The envelope response could not be serialized.
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl InvocationError {
    /// Short type name reported to the invocation platform.
    pub fn error_type(&self) -> &'static str {
        match self {
            InvocationError::Decode(_) => "DecodeError",
            InvocationError::Dispatch(_) => "DispatchError",
            InvocationError::StreamCollection(_) => "StreamCollectionError",
            InvocationError::Encode(_) => "EncodeError",
        }
    }
}

/// Cold-start step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    Bootstrap,
    Construct,
    Configure,
    AddRoutes,
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupStage::Bootstrap => write!(f, "bootstrap"),
            SetupStage::Construct => write!(f, "construct"),
            SetupStage::Configure => write!(f, "configure"),
            SetupStage::AddRoutes => write!(f, "add_routes"),
        }
    }
}

/// A setup hook failed during cold start. Fatal to the process.
#[derive(Error, Debug)]
#[error("setup failed during {stage}: {source}")]
pub struct SetupError {
    pub stage: SetupStage,
    #[source]
    pub source: BoxError,
}

impl SetupError {
    pub fn new(stage: SetupStage, source: BoxError) -> Self {
        Self { stage, source }
    }
}

/// Invalid runtime configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown operating mode: {0}")]
    InvalidMode(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    /// A gateway mode was selected without a runtime API address.
    #[error("AWS_LAMBDA_RUNTIME_API is not set")]
    MissingRuntimeApi,
}

/// Errors raised by the lifecycle controller and the process entry point.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The deconfigure hook failed while draining.
    #[error("teardown failed: {0}")]
    Teardown(#[source] BoxError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    /// Talking to the invocation platform failed.
    #[error("runtime API error: {0}")]
    Runtime(String),
}
