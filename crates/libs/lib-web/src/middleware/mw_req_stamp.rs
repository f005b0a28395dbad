//! # Request Stamping Middleware
//!
//! Gives every HTTP request a UUID so its log lines can be correlated. The id
//! is stored in request extensions and echoed in the `X-Request-ID` response
//! header.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use chrono::{DateTime, Utc};
use lib_utils::now_utc;
use uuid::Uuid;

/// Request metadata for tracing and debugging.
#[derive(Clone, Debug)]
pub struct RequestStamp {
    pub id: String,
    pub received_at: DateTime<Utc>,
}

impl RequestStamp {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            received_at: now_utc(),
        }
    }
}

/// Id of the stamped request, or `"unknown"` outside the stamping layer.
pub fn request_id<B>(req: &axum::http::Request<B>) -> String {
    req.extensions()
        .get::<RequestStamp>()
        .map(|s| s.id.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn stamp_req(mut req: Request, next: Next) -> Response {
    let stamp = RequestStamp::new();
    req.extensions_mut().insert(stamp.clone());

    let mut res = next.run(req).await;

    if let Ok(header_value) = HeaderValue::from_str(&stamp.id) {
        res.headers_mut().insert("X-Request-ID", header_value);
    }

    res
}
