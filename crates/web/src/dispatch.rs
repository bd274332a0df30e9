//! The per-request dispatch pipeline.
//!
//! One engine instance owns the global middleware chain and the route
//! table; both are immutable once the [`App`](crate::App) is turned into an
//! engine, so the engine is shared across connections without locking.
//!
//! Per request, in order:
//!
//! 1. build the [`RequestContext`] (normalized path, query map);
//! 2. parse the body as JSON for body-bearing methods (POST/PUT/PATCH),
//!    silently falling back to `{}`;
//! 3. run every global middleware in registration order — an entry that
//!    does not proceed ends the request with whatever it wrote (possibly
//!    nothing);
//! 4. look the route up; a miss responds `404`;
//! 5. run the matched handler chain in order with the same continuation
//!    convention; an erroring handler is contained at its own invocation
//!    and turns the response into a generic `500`, skipping the rest of
//!    the chain.
//!
//! Errors escaping the pipeline itself (in practice: middleware errors) hit
//! the outermost boundary and respond `500` with the error message. Every
//! failure path yields a well-formed response; nothing propagates past
//! [`DispatchEngine::dispatch`].

use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::handler::{BoxError, Handler, Next};
use crate::router::Router;
use crate::{RequestContext, ResponseHandle};

pub struct DispatchEngine {
    middleware: Vec<Box<dyn Handler>>,
    router: Router,
}

impl DispatchEngine {
    pub(crate) fn new(middleware: Vec<Box<dyn Handler>>, router: Router) -> Self {
        Self { middleware, router }
    }

    /// Runs one request through the pipeline.
    ///
    /// `None` means no entry finalized a response (a vetoing middleware or
    /// an exhausted chain that never wrote); the connection layer closes
    /// the connection without replying in that case.
    pub async fn dispatch(&self, request: Request<Bytes>) -> Option<Response<Bytes>> {
        match self.run(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(cause = %e, "request pipeline failed");
                Some(server_error(e.as_ref()))
            }
        }
    }

    async fn run(&self, request: Request<Bytes>) -> Result<Option<Response<Bytes>>, BoxError> {
        let (parts, payload) = request.into_parts();
        let mut ctx = RequestContext::from_parts(parts);

        // body stage: body-bearing methods only, malformed payloads stay {}
        if is_body_bearing(ctx.method()) {
            if let Ok(value) = serde_json::from_slice::<Value>(&payload) {
                ctx.set_body(value);
            }
        }

        let mut res = ResponseHandle::new();

        for entry in &self.middleware {
            let mut next = Next::new();
            entry.handle(&ctx, &mut res, &mut next).await?;
            if !next.is_proceeded() {
                debug!(path = ctx.path(), "middleware halted the chain");
                return Ok(res.into_response());
            }
        }

        let Some(matched) = self.router.lookup(ctx.method(), ctx.path()) else {
            // a middleware may have finalized a response and still proceeded;
            // that response stands, the 404 is only for an untouched handle
            if res.is_finalized() {
                return Ok(res.into_response());
            }
            return Ok(Some(not_found()));
        };
        let (handlers, params) = matched.into_parts();
        ctx.bind_params(params);

        for handler in handlers {
            let mut next = Next::new();
            if let Err(e) = handler.handle(&ctx, &mut res, &mut next).await {
                error!(cause = %e, path = ctx.path(), "handler failed, responding 500");
                if !res.is_finalized() {
                    res.status(StatusCode::INTERNAL_SERVER_ERROR)
                        .json(&json!({"error": "Internal Server Error"}));
                }
                break;
            }
            if !next.is_proceeded() {
                break;
            }
        }

        Ok(res.into_response())
    }
}

#[async_trait]
impl lark_http::handler::Handler for DispatchEngine {
    async fn call(&self, request: Request<Bytes>) -> Option<Response<Bytes>> {
        self.dispatch(request).await
    }
}

fn is_body_bearing(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

fn framework_response(status: StatusCode, body: Value) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref().parse().unwrap());
    response
}

fn not_found() -> Response<Bytes> {
    framework_response(StatusCode::NOT_FOUND, json!({"error": "Route not found"}))
}

fn server_error(cause: &(dyn std::error::Error + Send + Sync)) -> Response<Bytes> {
    framework_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "Server error", "message": cause.to_string()}),
    )
}
