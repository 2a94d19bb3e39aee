//! Lambda Bridge - reverse-text demo application
//!
//! `HOST_LAMBDA=1` serves it on a local socket; otherwise it handles
//! API Gateway invocations from the runtime API.

use lambda_bridge::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct ReverseRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct ReverseResponse {
    text: String,
    reversed: String,
}

/// Replies to `GET /` and reverses the `text` posted to `POST /`.
struct ReverseText;

#[async_trait]
impl LambdaApp for ReverseText {
    async fn init(app: &Application) -> Result<Self, BoxError> {
        if let Some(stage) = app.env("STAGE") {
            tracing::info!("Loading reverse-text for stage {}", stage);
        }
        Ok(ReverseText)
    }

    async fn add_routes(&self, app: &mut Application) -> Result<(), BoxError> {
        app.get("/", |_req: Request| async move {
            Ok::<_, HttpError>(Response::text("Hello"))
        })
        .post("/", |req: Request| async move {
            let input: ReverseRequest = req
                .json()
                .ok_or_else(|| HttpError::bad_request("Missing request body"))??;
            let reversed = input.text.chars().rev().collect();
            Ok::<_, HttpError>(Response::json(&ReverseResponse {
                text: input.text,
                reversed,
            })?)
        });
        Ok(())
    }

    async fn deconfigure(&self, _app: &Application) -> Result<(), BoxError> {
        tracing::info!("Unloading reverse-text");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = RuntimeConfig::from_env()?;
    lambda_bridge::runtime::run::<ReverseText>(config).await?;
    Ok(())
}
