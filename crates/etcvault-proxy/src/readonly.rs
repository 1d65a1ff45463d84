//! Readonly mode: a middleware wrapping the whole proxy so that only GET
//! requests pass.

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};

/// Wrap a router so non-GET methods are rejected.
#[must_use]
pub fn apply(router: axum::Router) -> axum::Router {
    router.layer(middleware::from_fn(guard))
}

async fn guard(request: Request, next: Next) -> Response {
    if request.method() != Method::GET {
        // 405 would be truer, but etcd's own proxy answers 501 here and
        // clients match on it.
        return StatusCode::NOT_IMPLEMENTED.into_response();
    }
    next.run(request).await
}
