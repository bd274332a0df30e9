//! Full-stack round trip: a real listener, raw bytes over TCP, and the
//! dispatch pipeline behind it.

use lark_web::{handler_fn, App, HandlerFuture, Next, RequestContext, ResponseHandle};
use serde_json::json;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

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

fn echo_body<'a>(
    ctx: &'a RequestContext,
    res: &'a mut ResponseHandle,
    _next: &'a mut Next,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        res.json(&json!({ "body": ctx.body() }));
        Ok(())
    })
}

async fn start_app() -> SocketAddr {
    let (addr_tx, addr_rx) = oneshot::channel();

    tokio::spawn(async move {
        App::new()
            .get("/users/:id", handler_fn(show_user))
            .post("/echo", handler_fn(echo_body))
            .listen(0, |addr| {
                let _ = addr_tx.send(addr);
            })
            .await
            .unwrap();
    });

    addr_rx.await.expect("server failed to start")
}

async fn roundtrip(addr: SocketAddr, raw_request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw_request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    String::from_utf8(raw).unwrap()
}

#[tokio::test]
async fn routed_request_binds_params_over_the_wire() {
    let addr = start_app().await;

    let response =
        roundtrip(addr, "GET /users/42 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("content-type: application/json\r\n"));
    assert!(response.ends_with(r#"{"id":"42"}"#));
}

#[tokio::test]
async fn unmatched_route_is_404_over_the_wire() {
    let addr = start_app().await;

    let response =
        roundtrip(addr, "GET /nowhere HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(response.ends_with(r#"{"error":"Route not found"}"#));
}

#[tokio::test]
async fn posted_json_reaches_the_handler() {
    let addr = start_app().await;

    let body = r#"{"a":1}"#;
    let request = format!(
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let response = roundtrip(addr, &request).await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with(r#"{"body":{"a":1}}"#));
}

#[tokio::test]
async fn trailing_slash_is_routed_like_the_bare_path() {
    let addr = start_app().await;

    let response =
        roundtrip(addr, "GET /users/7/ HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with(r#"{"id":"7"}"#));
}
