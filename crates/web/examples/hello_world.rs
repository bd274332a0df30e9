use lark_web::{handler_fn, App, HandlerFuture, Next, RequestContext, ResponseHandle};
use serde_json::json;

// curl -v http://127.0.0.1:8080/
fn hello<'a>(
    _ctx: &'a RequestContext,
    res: &'a mut ResponseHandle,
    _next: &'a mut Next,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        res.text("hello world\r\n");
        Ok(())
    })
}

// curl -v http://127.0.0.1:8080/users/42
fn show_user<'a>(
    ctx: &'a RequestContext,
    res: &'a mut ResponseHandle,
    _next: &'a mut Next,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        res.json(&json!({ "id": ctx.param("id") }));
        Ok(())
    })
}

// curl -v -H 'Content-Type: application/json' -d '{"name":"lark"}' http://127.0.0.1:8080/users
fn create_user<'a>(
    ctx: &'a RequestContext,
    res: &'a mut ResponseHandle,
    _next: &'a mut Next,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        res.status(http::StatusCode::CREATED).json(&json!({ "received": ctx.body() }));
        Ok(())
    })
}

fn log_requests<'a>(
    ctx: &'a RequestContext,
    _res: &'a mut ResponseHandle,
    next: &'a mut Next,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        println!("{} {}", ctx.method(), ctx.path());
        next.proceed();
        Ok(())
    })
}

#[tokio::main]
async fn main() {
    App::new()
        .middleware(handler_fn(log_requests))
        .get("/", handler_fn(hello))
        .get("/users/:id", handler_fn(show_user))
        .post("/users", handler_fn(create_user))
        .listen(8080, |addr| println!("listening on {addr}"))
        .await
        .unwrap();
}
