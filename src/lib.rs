//! # verdict
//!
//! A minimal web framework built around one idea: business logic says *what
//! happened*, the application decides *what to send back*.
//!
//! ## The pipeline
//!
//! ```text
//! request ─▶ Kernel ─▶ Router ─▶ handler
//!                                  └─ App::pipe(["update"], payload)
//!                                       ├─ procedure(Todo, Dep<dyn TodoManager>)
//!                                       │     → (2001, {})
//!                                       └─ StatusRegistry[[2001]] → 404 response
//! ```
//!
//! - **Procedures** are plain functions. Their arguments are injected from
//!   the payload or the [`Container`]; they return `(status, payload)`.
//! - **Statuses** are domain codes, not HTTP codes. Each one (or each exact
//!   sequence of them) maps to one callback in the [`StatusRegistry`].
//! - **The kernel** routes, builds the input store, runs the handler and is
//!   the single error boundary: infrastructure faults become a `500`.
//!
//! ## Quick start
//!
//! ```rust
//! use verdict::{App, Kernel, Payload, Request, Response, Router};
//!
//! fn greet() -> (u32, Payload) {
//!     (1, Payload::new().with("greeting", "hello"))
//! }
//!
//! async fn hello(req: Request) -> Result<Response, verdict::Error> {
//!     req.app().pipe(&["i want to be greeted"], Payload::new())
//! }
//!
//! let mut app = App::new();
//! app.when("i want to be greeted", greet).unwrap();
//! app.matching([1], |_, payload: Payload| Response::to_json(&payload.into_value()))
//!     .unwrap();
//!
//! let kernel = Kernel::new(app, Router::new().get("/", hello));
//! # drop(kernel);
//! ```

mod app;
mod container;
mod error;
mod handler;
mod kernel;
mod method;
mod payload;
mod procedure;
mod request;
mod response;
mod router;
mod server;
mod session;
mod status;
mod statuses;
mod view;

pub mod config;
pub mod health;
pub mod todo;

pub use app::{App, Pipeline};
pub use container::Container;
pub use error::Error;
pub use handler::Handler;
pub use kernel::{BACK_KEY, Kernel};
pub use method::{Method, UnknownMethod};
pub use payload::Payload;
pub use procedure::{Context, Dep, Field, Inject, IntoOutcome, Outcome, Procedure};
pub use request::{Incoming, Request};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder, STATUS_HEADER};
pub use router::Router;
pub use server::Server;
pub use session::{SESSION_COOKIE, Session, SessionData, SessionStore};
pub use status::Status;
pub use statuses::{Callback, Reply, StatusRegistry};
pub use view::View;
