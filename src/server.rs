//! HTTP server and graceful shutdown.
//!
//! The server is the transport edge: it turns hyper requests into
//! [`Incoming`] values, hands them to the [`Kernel`] and writes whatever
//! comes back. Nothing about routing, sessions or statuses lives here.
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets every in-flight
//! connection finish, then returns from [`Server::serve`].

use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::kernel::Kernel;
use crate::method::Method;
use crate::request::Incoming;
use crate::response::Response;

/// Request bodies larger than this are refused with `413`.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    body_limit: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr, body_limit: DEFAULT_BODY_LIMIT }
    }

    /// Caps the size of a request body, in bytes.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Starts accepting connections and dispatching them through `kernel`.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, kernel: Kernel) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let kernel = Arc::new(kernel);
        let body_limit = self.body_limit;

        info!(addr = %self.addr, "verdict listening");

        let mut tasks = tokio::task::JoinSet::new();
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting at once,
                // even with connections queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let kernel = Arc::clone(&kernel);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let kernel = Arc::clone(&kernel);
                            async move { dispatch(&kernel, req, body_limit).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("verdict stopped");
        Ok(())
    }
}

/// Converts one hyper request and runs it through the kernel.
///
/// Every failure becomes a response, so hyper never sees an error.
async fn dispatch<B>(
    kernel: &Kernel,
    req: hyper::Request<B>,
    body_limit: usize,
) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let Ok(method) = Method::try_from(req.method()) else {
        return Ok(Response::status(http::StatusCode::METHOD_NOT_ALLOWED).into_inner());
    };

    let uri = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_owned(), |pq| pq.as_str().to_owned());

    let mut incoming = Incoming::new(method, uri);
    for (name, value) in req.headers() {
        match value.to_str() {
            Ok(value) => incoming = incoming.header(name.as_str(), value),
            Err(_) => warn!(header = %name, "ignoring non-ASCII request header"),
        }
    }

    let body = match Limited::new(req.into_body(), body_limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(limit = body_limit, "request body too large");
            return Ok(Response::status(http::StatusCode::PAYLOAD_TOO_LARGE).into_inner());
        }
        Err(e) => {
            warn!("failed to read request body: {e}");
            return Ok(Response::status(http::StatusCode::BAD_REQUEST).into_inner());
        }
    };

    Ok(kernel.handle(incoming.body(body)).await.into_inner())
}

/// Resolves on the first SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{App, Router};

    fn kernel() -> Kernel {
        let router = Router::new().post("/echo", |req: crate::Request| async move {
            Response::text(String::from_utf8_lossy(req.body()).into_owned())
        });
        Kernel::new(App::new(), router)
    }

    fn post(body: &'static str) -> hyper::Request<Full<Bytes>> {
        hyper::Request::post("/echo").body(Full::new(Bytes::from(body))).unwrap()
    }

    #[tokio::test]
    async fn bodies_within_the_limit_reach_the_kernel() {
        let response = dispatch(&kernel(), post("hello"), 5).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.into_body().collect().await.unwrap().to_bytes(), "hello");
    }

    #[tokio::test]
    async fn oversized_bodies_are_refused() {
        let response = dispatch(&kernel(), post("hello!"), 5).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn unknown_methods_are_not_allowed() {
        let req = hyper::Request::builder()
            .method("BREW")
            .uri("/echo")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = dispatch(&kernel(), req, DEFAULT_BODY_LIMIT).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::METHOD_NOT_ALLOWED);
    }
}
