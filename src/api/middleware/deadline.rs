//! Request deadline for routes that wait on external services.
//!
//! An overrun is answered with the usual JSON error body and status 408.
//! The blocking work behind the request is not interrupted; the Q&A
//! pipeline bounds itself to finish inside the same deadline.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;

pub async fn enforce(State(deadline): State<Duration>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    match tokio::time::timeout(deadline, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(path, deadline_secs = deadline.as_secs(), "Request deadline exceeded");
            ApiError::Timeout(deadline.as_secs()).into_response()
        }
    }
}
