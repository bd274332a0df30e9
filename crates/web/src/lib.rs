//! A minimal request-routing and middleware-dispatch web framework.
//!
//! `lark-web` matches an incoming request's method and path against an
//! ordered route table, extracts named path parameters, runs the global
//! middleware chain and then the matched route's handler chain, and
//! produces the response — with short-circuiting via an explicit
//! continuation and per-handler error containment.
//!
//! ```no_run
//! use lark_web::{handler_fn, App, HandlerFuture, Next, RequestContext, ResponseHandle};
//! use serde_json::json;
//!
//! fn show_user<'a>(
//!     ctx: &'a RequestContext,
//!     res: &'a mut ResponseHandle,
//!     _next: &'a mut Next,
//! ) -> HandlerFuture<'a> {
//!     Box::pin(async move {
//!         res.json(&json!({ "id": ctx.param("id") }));
//!         Ok(())
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     App::new()
//!         .get("/users/:id", handler_fn(show_user))
//!         .listen(8080, |addr| println!("listening on {addr}"))
//!         .await
//!         .unwrap();
//! }
//! ```

mod app;
mod dispatch;
mod handler;
mod pattern;
mod request;
mod response;
mod router;

pub use app::{App, ListenOptions, ServeError};
pub use dispatch::DispatchEngine;
pub use handler::{handler_fn, BoxError, FnHandler, Handler, HandlerChain, HandlerFuture, IntoHandlerChain, Next};
pub use pattern::{normalize_path, PathPattern};
pub use request::RequestContext;
pub use response::ResponseHandle;
pub use router::{RouteMatch, Router};
