//! Connection lifecycle management.
//!
//! [`HttpConnection`] drives a single client connection: it reads complete
//! requests off a [`FramedRead`], hands each one to the [`Handler`], and
//! writes the response through a [`FramedWrite`]. Connections are kept alive
//! for HTTP/1.1 unless the client asks otherwise; HTTP/1.0 closes after one
//! exchange unless the client asks for keep-alive.

use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::header::CONNECTION;
use http::{HeaderValue, Request, Response, StatusCode, Version};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::HttpError;

pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    /// Processes requests until the connection closes.
    ///
    /// A parse failure answers with `400` and tears the connection down. A
    /// handler that returns `None` closes the connection without writing a
    /// response.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(request)) => {
                    let close = !keep_alive(&request);

                    match handler.call(request).await {
                        Some(mut response) => {
                            if close {
                                response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
                            }
                            self.framed_write.send(response).await?;
                            if close {
                                break;
                            }
                        }
                        None => {
                            warn!("handler produced no response, closing connection without replying");
                            break;
                        }
                    }
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't parse request, shutting connection down");
                    self.framed_write.send(bad_request()).await?;
                    return Err(e.into());
                }

                None => {
                    info!("no more requests, connection closed by peer");
                    break;
                }
            }
        }

        Ok(())
    }
}

fn keep_alive(request: &Request<Bytes>) -> bool {
    let connection = request.headers().get(CONNECTION).and_then(|v| v.to_str().ok());
    match request.version() {
        Version::HTTP_11 => !connection.is_some_and(|v| v.eq_ignore_ascii_case("close")),
        Version::HTTP_10 => connection.is_some_and(|v| v.eq_ignore_ascii_case("keep-alive")),
        _ => false,
    }
}

fn bad_request() -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));
    response
}
