//! Response model with single-read body semantics.
//!
//! A body can be read exactly once. Anything that needs the payload twice,
//! such as returning it to the page while also persisting it, must call
//! [`Response::duplicate`] before either side reads it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Status that makes a response eligible for caching.
pub const CACHEABLE_STATUS: u16 = 200;

/// A response from the network, a store, or a synthetic fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

/// Serializable response head, as persisted next to the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl Response {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: Some(body.into()) }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the response may be written to a store.
    pub fn is_cacheable(&self) -> bool {
        self.status == CACHEABLE_STATUS
    }

    pub fn body_used(&self) -> bool {
        self.body.is_none()
    }

    /// Read the body, leaving this response consumed.
    pub fn take_body(&mut self) -> Result<Bytes, Error> {
        self.body.take().ok_or(Error::BodyUsed)
    }

    /// Consume the response and return its body.
    pub fn into_body(mut self) -> Result<Bytes, Error> {
        self.take_body()
    }

    /// Branch into an independent copy with its own unread body.
    pub fn duplicate(&self) -> Result<Response, Error> {
        let body = self.body.as_ref().ok_or(Error::BodyUsed)?;
        Ok(Response { status: self.status, headers: self.headers.clone(), body: Some(body.clone()) })
    }

    pub fn head(&self) -> ResponseHead {
        ResponseHead { status: self.status, headers: self.headers.clone() }
    }

    pub fn from_parts(head: ResponseHead, body: impl Into<Bytes>) -> Self {
        Self::new(head.status, head.headers, body)
    }
}
