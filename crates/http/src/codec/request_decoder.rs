//! Streaming HTTP request decoder.
//!
//! The decoder runs a two-state machine: parse the head with [`httparse`],
//! then accumulate the content-length delimited body. It yields one *complete*
//! [`Request<Bytes>`] per request; the dispatch layer above never sees a
//! partial body, so body accumulation is the only point where a request can
//! suspend.
//!
//! Chunked transfer-encoding is rejected with [`ParseError`]: the engine
//! contract requires fully accumulated bodies, and a client that cannot send
//! a content-length has no way to satisfy it.

use std::cmp;
use std::mem;

use crate::protocol::ParseError;
use bytes::{Buf, Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderName, HeaderValue, Method, Request, Uri, Version};
use tokio_util::codec::Decoder;

const MAX_HEADER_BYTES: usize = 8 * 1024;
const MAX_HEADER_NUM: usize = 64;
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// A decoder that turns a byte stream into complete HTTP/1.1 requests.
pub struct RequestDecoder {
    state: DecodeState,
}

enum DecodeState {
    /// Waiting for (more of) the request head.
    Head,
    /// Head parsed; accumulating `remaining` body bytes.
    Body { head: Request<()>, remaining: usize, collected: BytesMut },
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { state: DecodeState::Head }
    }
}

impl Decoder for RequestDecoder {
    type Item = Request<Bytes>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match &mut self.state {
                DecodeState::Head => {
                    let (head, offset) = match parse_head(src)? {
                        Some(parsed) => parsed,
                        None => {
                            if src.len() > MAX_HEADER_BYTES {
                                return Err(ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                            }
                            return Ok(None);
                        }
                    };

                    let body_len = body_length(&head)?;
                    src.advance(offset);

                    if body_len == 0 {
                        let (parts, ()) = head.into_parts();
                        return Ok(Some(Request::from_parts(parts, Bytes::new())));
                    }

                    let collected = BytesMut::with_capacity(cmp::min(body_len, src.len().max(1024)));
                    self.state = DecodeState::Body { head, remaining: body_len, collected };
                    // loop again to drain body bytes already buffered
                }

                DecodeState::Body { remaining, collected, .. } => {
                    if *remaining > 0 {
                        if src.is_empty() {
                            return Ok(None);
                        }
                        let len = cmp::min(*remaining, src.len());
                        collected.extend_from_slice(&src.split_to(len));
                        *remaining -= len;
                        if *remaining > 0 {
                            return Ok(None);
                        }
                    }

                    match mem::replace(&mut self.state, DecodeState::Head) {
                        DecodeState::Body { head, collected, .. } => {
                            let (parts, ()) = head.into_parts();
                            return Ok(Some(Request::from_parts(parts, collected.freeze())));
                        }
                        DecodeState::Head => unreachable!("state checked above"),
                    }
                }
            }
        }
    }
}

/// Parses a request head from the front of `src` without consuming it.
///
/// Returns the head and the number of bytes it occupied, or `None` if the
/// buffer does not yet hold a full head.
fn parse_head(src: &BytesMut) -> Result<Option<(Request<()>, usize)>, ParseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let mut parsed = httparse::Request::new(&mut headers);

    let offset = match parsed.parse(src.as_ref()) {
        Ok(httparse::Status::Complete(offset)) => offset,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(httparse::Error::TooManyHeaders) => {
            return Err(ParseError::TooManyHeaders { max_num: MAX_HEADER_NUM })
        }
        Err(e) => return Err(ParseError::invalid_header(e)),
    };

    let method =
        Method::from_bytes(parsed.method.unwrap_or_default().as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
    let uri = parsed.path.unwrap_or_default().parse::<Uri>().map_err(|_| ParseError::InvalidUri)?;
    let version = match parsed.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        other => return Err(ParseError::InvalidVersion(other)),
    };

    let mut head = Request::new(());
    *head.method_mut() = method;
    *head.uri_mut() = uri;
    *head.version_mut() = version;

    let header_map = head.headers_mut();
    header_map.reserve(parsed.headers.len());
    for header in parsed.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
        let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
        header_map.append(name, value);
    }

    Ok(Some((head, offset)))
}

/// Determines the body framing of a decoded head.
fn body_length(head: &Request<()>) -> Result<usize, ParseError> {
    if let Some(value) = head.headers().get(TRANSFER_ENCODING) {
        let encoding = value.to_str().unwrap_or("<non-ascii>");
        return Err(ParseError::unsupported_transfer_encoding(encoding));
    }

    let Some(value) = head.headers().get(CONTENT_LENGTH) else {
        return Ok(0);
    };

    let length = value
        .to_str()
        .map_err(ParseError::invalid_content_length)?
        .parse::<usize>()
        .map_err(ParseError::invalid_content_length)?;

    if length > MAX_BODY_BYTES {
        return Err(ParseError::invalid_content_length(format!(
            "length {length} exceeds the limit {MAX_BODY_BYTES}"
        )));
    }

    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn buffer(raw: &str) -> BytesMut {
        BytesMut::from(raw.replace('\n', "\r\n").as_bytes())
    }

    #[test]
    fn decode_request_without_body() {
        let mut buffer = buffer(indoc! {"
            GET /users/42?debug=1 HTTP/1.1
            Host: 127.0.0.1:8080
            Accept: */*

        "});

        let mut decoder = RequestDecoder::new();
        let request = decoder.decode(&mut buffer).unwrap().unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), "/users/42");
        assert_eq!(request.uri().query(), Some("debug=1"));
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.headers().get("host").unwrap(), "127.0.0.1:8080");
        assert!(request.body().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn decode_request_with_content_length_body() {
        let mut buffer = buffer(indoc! {"
            POST /items HTTP/1.1
            Host: localhost
            Content-Length: 7

            <body>!"});

        let mut decoder = RequestDecoder::new();
        let request = decoder.decode(&mut buffer).unwrap().unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.body().as_ref(), b"<body>!");
    }

    #[test]
    fn decode_body_arriving_in_pieces() {
        let mut decoder = RequestDecoder::new();

        let mut buffer = buffer(indoc! {"
            PUT /items/1 HTTP/1.1
            Content-Length: 10

            01234"});
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"56789");
        let request = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(request.body().as_ref(), b"0123456789");
    }

    #[test]
    fn partial_head_waits_for_more_data() {
        let mut buffer = BytesMut::from(&b"GET /part"[..]);
        let mut decoder = RequestDecoder::new();
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        // original bytes stay in place for the next read
        assert_eq!(buffer.as_ref(), b"GET /part");
    }

    #[test]
    fn chunked_transfer_encoding_is_rejected() {
        let mut buffer = buffer(indoc! {"
            POST /upload HTTP/1.1
            Transfer-Encoding: chunked

        "});

        let mut decoder = RequestDecoder::new();
        let err = decoder.decode(&mut buffer).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedTransferEncoding { .. }));
    }

    #[test]
    fn oversized_header_block_is_rejected() {
        let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\n"[..]);
        let filler = format!("X-Filler: {}\r\n", "a".repeat(MAX_HEADER_BYTES));
        buffer.extend_from_slice(filler.as_bytes());

        let mut decoder = RequestDecoder::new();
        let err = decoder.decode(&mut buffer).unwrap_err();
        assert!(matches!(err, ParseError::TooLargeHeader { .. }));
    }

    #[test]
    fn too_many_headers_are_rejected() {
        let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\n"[..]);
        for i in 0..=MAX_HEADER_NUM {
            buffer.extend_from_slice(format!("x-filler-{i}: v\r\n").as_bytes());
        }
        buffer.extend_from_slice(b"\r\n");

        let mut decoder = RequestDecoder::new();
        let err = decoder.decode(&mut buffer).unwrap_err();
        assert!(matches!(err, ParseError::TooManyHeaders { .. }));
    }

    #[test]
    fn decode_two_pipelined_requests() {
        let mut buffer = buffer(indoc! {"
            GET /first HTTP/1.1

            GET /second HTTP/1.1

        "});

        let mut decoder = RequestDecoder::new();
        let first = decoder.decode(&mut buffer).unwrap().unwrap();
        let second = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(first.uri().path(), "/first");
        assert_eq!(second.uri().path(), "/second");
    }
}
