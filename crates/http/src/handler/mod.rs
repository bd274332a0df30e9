//! The per-connection callback surface.
//!
//! A [`Handler`] receives one fully-read request and produces the response
//! to write back. Returning `None` means the application produced no
//! response at all for this request; the connection is closed without
//! writing anything.

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use std::future::Future;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: Request<Bytes>) -> Option<Response<Bytes>>;
}

/// A [`Handler`] built from a plain async function.
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync,
    Fut: Future<Output = Option<Response<Bytes>>> + Send,
{
    async fn call(&self, request: Request<Bytes>) -> Option<Response<Bytes>> {
        (self.f)(request).await
    }
}

pub fn make_handler<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync,
    Fut: Future<Output = Option<Response<Bytes>>> + Send,
{
    HandlerFn { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn assert_is_handler<T: Handler>(_handler: &T) {
        // no op
    }

    #[tokio::test]
    async fn fn_is_handler() {
        async fn echo_path(request: Request<Bytes>) -> Option<Response<Bytes>> {
            let body = Bytes::from(request.uri().path().to_string());
            Some(Response::builder().status(StatusCode::OK).body(body).unwrap())
        }

        let handler = make_handler(echo_path);
        assert_is_handler(&handler);

        let request = Request::builder().uri("/ping").body(Bytes::new()).unwrap();
        let response = handler.call(request).await.unwrap();
        assert_eq!(response.body().as_ref(), b"/ping");
    }
}
