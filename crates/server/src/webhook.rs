//! Mounting of the Telegram webhook endpoint.

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::Request,
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::Response,
};
use serde::Deserialize;

use std::{future::Future, pin::Pin};

/// Updates larger than this are rejected before parsing.
const MAX_UPDATE_BYTES: usize = 1024 * 1024;

type Shutdown = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A webhook router produced by the bot, plus the future that resolves when
/// the bot stops listening.
pub struct Webhook {
    router: Router,
    shutdown: Shutdown,
}

impl Webhook {
    pub fn new(router: Router, shutdown: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            router,
            shutdown: Box::pin(shutdown),
        }
    }

    pub(crate) fn into_parts(self) -> (Router, Shutdown) {
        (self.router, self.shutdown)
    }
}

/// Answers 400 to any POST whose body is not a Telegram update.
pub(crate) fn guard(router: Router) -> Router {
    router.layer(middleware::from_fn(reject_malformed_update))
}

#[derive(Deserialize)]
struct UpdateEnvelope {
    #[allow(dead_code)]
    update_id: i64,
}

async fn reject_malformed_update(request: Request, next: Next) -> Result<Response, StatusCode> {
    if request.method() != Method::POST {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_UPDATE_BYTES)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    if serde_json::from_slice::<UpdateEnvelope>(&bytes).is_err() {
        tracing::warn!("rejected malformed update ({} bytes)", bytes.len());
        return Err(StatusCode::BAD_REQUEST);
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
