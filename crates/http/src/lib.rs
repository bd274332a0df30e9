//! A small asynchronous HTTP/1.1 transport.
//!
//! This crate is the network collaborator for the `lark-web` dispatch
//! engine: it owns the byte-level concerns (header parsing, body framing,
//! keep-alive) and hands complete requests to a [`handler::Handler`].
//!
//! - [`connection::HttpConnection`]: per-connection request/response loop
//! - [`codec`]: [`tokio_util`] codec implementations for requests/responses
//! - [`handler`]: the per-connection callback trait
//! - [`protocol`]: the transport error taxonomy
//!
//! Bodies are always fully accumulated before a request is surfaced; there
//! is no streaming body access. Chunked transfer-encoding is therefore
//! rejected at the parser.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use tokio::net::TcpListener;
//! use lark_http::connection::HttpConnection;
//! use lark_http::handler::make_handler;
//!
//! async fn hello(_request: Request<Bytes>) -> Option<Response<Bytes>> {
//!     Some(Response::new(Bytes::from_static(b"hello world")))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let handler = Arc::new(make_handler(hello));
//!     loop {
//!         let (stream, _remote_addr) = listener.accept().await.unwrap();
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = stream.into_split();
//!             let _ = HttpConnection::new(reader, writer).process(handler).await;
//!         });
//!     }
//! }
//! ```

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
