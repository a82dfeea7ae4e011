//! Built-in health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? |
//! | **Readiness** | `/readyz` | Is the application wired to serve traffic? |
//!
//! ```rust
//! use verdict::{Router, health};
//!
//! let router = Router::new()
//!     .get("/healthz", health::liveness)
//!     .get("/readyz", health::readiness);
//! ```

use http::StatusCode;

use crate::{Request, Response};

/// Always `200 OK` with body `"ok"`.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// `200 OK` once at least one status callback is registered, `503`
/// otherwise. An app without status callbacks cannot answer any procedure.
pub async fn readiness(req: Request) -> Response {
    if req.app().statuses().is_empty() {
        Response::status(StatusCode::SERVICE_UNAVAILABLE)
    } else {
        Response::text("ready")
    }
}
