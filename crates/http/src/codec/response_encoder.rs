//! HTTP response encoder.
//!
//! Serializes a complete [`Response<Bytes>`] into wire format. The encoder
//! owns body framing: it always emits a `content-length` computed from the
//! actual body and ignores any framing headers the handler may have set.

use crate::protocol::SendError;
use bytes::{BufMut, Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::Response;
use tokio_util::codec::Encoder;

pub struct ResponseEncoder;

impl ResponseEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<Response<Bytes>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, response: Response<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (parts, body) = response.into_parts();

        dst.reserve(128 + body.len());

        dst.put_slice(b"HTTP/1.1 ");
        dst.put_slice(parts.status.as_str().as_bytes());
        dst.put_slice(b" ");
        dst.put_slice(parts.status.canonical_reason().unwrap_or("Unknown").as_bytes());
        dst.put_slice(b"\r\n");

        for (name, value) in parts.headers.iter() {
            // body framing is the encoder's business
            if name == CONTENT_LENGTH || name == TRANSFER_ENCODING {
                continue;
            }
            dst.put_slice(name.as_str().as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }

        dst.put_slice(b"content-length: ");
        dst.put_slice(body.len().to_string().as_bytes());
        dst.put_slice(b"\r\n\r\n");

        dst.put_slice(&body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn encode(response: Response<Bytes>) -> String {
        let mut encoder = ResponseEncoder::new();
        let mut dst = BytesMut::new();
        encoder.encode(response, &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn encode_response_with_body() {
        let response = Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(Bytes::from_static(b"{\"ok\":true}"))
            .unwrap();

        let wire = encode(response);
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains("content-type: application/json\r\n"));
        assert!(wire.contains("content-length: 11\r\n"));
        assert!(wire.ends_with("\r\n\r\n{\"ok\":true}"));
    }

    #[test]
    fn encode_empty_body_sets_zero_length() {
        let response = Response::builder().status(StatusCode::NOT_FOUND).body(Bytes::new()).unwrap();

        let wire = encode(response);
        assert!(wire.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(wire.contains("content-length: 0\r\n"));
    }

    #[test]
    fn stale_framing_headers_are_dropped() {
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_LENGTH, "999")
            .body(Bytes::from_static(b"hi"))
            .unwrap();

        let wire = encode(response);
        assert!(!wire.contains("999"));
        assert!(wire.contains("content-length: 2\r\n"));
    }
}
