//! The response-construction handle given to every chain entry.
//!
//! Status and headers stay mutable until a body write (`json` or `text`)
//! finalizes the response. Once finalized, every further write is a logged
//! no-op: whichever entry writes first wins, and a later double write can
//! never corrupt bytes already decided on.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use serde::Serialize;
use tracing::{error, warn};

pub struct ResponseHandle {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
    finalized: bool,
}

impl ResponseHandle {
    pub(crate) fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: None, finalized: false }
    }

    /// Sets the status code. Chainable.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        if self.finalized {
            warn!("response already finalized, ignoring status change");
            return self;
        }
        self.status = status;
        self
    }

    /// Sets a response header. Chainable.
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        if self.finalized {
            warn!("response already finalized, ignoring header change");
            return self;
        }
        self.headers.insert(name, value);
        self
    }

    /// Serializes `value` as the JSON body and finalizes the response.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) {
        if self.finalized {
            warn!("response already finalized, ignoring json write");
            return;
        }

        match serde_json::to_vec(value) {
            Ok(serialized) => {
                self.headers.insert(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref().parse().unwrap());
                self.body = Some(Bytes::from(serialized));
            }
            Err(e) => {
                error!(cause = %e, "can't serialize response body");
                self.status = StatusCode::INTERNAL_SERVER_ERROR;
                self.headers.insert(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref().parse().unwrap());
                self.body = Some(Bytes::from_static(br#"{"error":"Internal Server Error"}"#));
            }
        }
        self.finalized = true;
    }

    /// Writes a plain-text body and finalizes the response.
    pub fn text(&mut self, body: impl Into<Bytes>) {
        if self.finalized {
            warn!("response already finalized, ignoring text write");
            return;
        }
        self.headers.insert(CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref().parse().unwrap());
        self.body = Some(body.into());
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Consumes the handle. `None` if nothing ever finalized a response.
    pub(crate) fn into_response(self) -> Option<Response<Bytes>> {
        if !self.finalized {
            return None;
        }

        let mut response = Response::new(self.body.unwrap_or_default());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn unwritten_handle_yields_no_response() {
        let res = ResponseHandle::new();
        assert!(!res.is_finalized());
        assert!(res.into_response().is_none());
    }

    #[test]
    fn status_and_json_build_a_response() {
        let mut res = ResponseHandle::new();
        res.status(StatusCode::CREATED).json(&json!({"id": 7}));

        let response = res.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!({"id": 7}));
    }

    #[test]
    fn second_write_is_a_no_op() {
        let mut res = ResponseHandle::new();
        res.json(&json!({"first": true}));
        res.status(StatusCode::IM_A_TEAPOT).json(&json!({"second": true}));

        let response = res.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!({"first": true}));
    }

    #[test]
    fn text_sets_plain_content_type() {
        let mut res = ResponseHandle::new();
        res.text("hello");

        let response = res.into_response().unwrap();
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain; charset=utf-8");
        assert_eq!(response.body().as_ref(), b"hello");
    }
}
