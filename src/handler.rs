//! Route handler trait and type erasure.
//!
//! A route handler is any `async fn(Request) -> impl IntoResponse`. Most
//! handlers in a verdict application are a couple of lines: read input off
//! the request, build a [`Payload`](crate::Payload), call
//! [`App::pipe`](crate::App::pipe) or [`App::fulfill`](crate::App::fulfill)
//! and return the `Result`.
//!
//! Handlers of different concrete types live in one routing table, so they
//! are stored as trait objects:
//!
//! ```text
//! async fn update_todo(req: Request) -> Result<Response, Error>
//!        ↓ router.put("/todos/{id}", update_todo)
//! Arc::new(FnHandler(update_todo))     stored as BoxedHandler
//!        ↓ at request time
//! handler.call(req)                    one vtable dispatch
//!        ↓
//! Box::pin(async { update_todo(req).await.into_response() })
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of [`Handler::into_boxed_handler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Sealed: the blanket impl for `Fn(Request) -> impl Future<Output = impl
/// IntoResponse>` is the only one.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
