//! The todo list service.
//!
//! Run with:
//!   RUST_LOG=verdict=debug cargo run
//!
//! Try:
//!   curl http://localhost:3000/todos
//!   curl -X POST http://localhost:3000/todos -d 'description=milk'
//!   curl -X PUT http://localhost:3000/todos/1 -d 'description=oat milk&completed=true'
//!   curl -X DELETE http://localhost:3000/todos/1

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use verdict::config::Config;
use verdict::todo::{procedures, web};
use verdict::{App, Error, Kernel, Router, Server, View, health};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(
        todo_file = %config.todo_file.display(),
        views = %config.views.display(),
        "configuration loaded"
    );

    let mut app = App::new();
    app.container_mut().instance(Arc::new(View::new(&config.views)));
    web::bind(&mut app, &config.todo_file);
    procedures::register(&mut app)?;
    web::statuses(&mut app)?;

    let router = web::routes(Router::new())
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness);

    Server::bind(config.addr)
        .body_limit(config.body_limit)
        .serve(Kernel::new(app, router))
        .await
}
