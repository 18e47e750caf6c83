//! Request-identity cache key generation.

use sha2::{Digest, Sha256};

use crate::request::Request;

/// Compute the identity key of a request: method plus URL without fragment.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Identity key for an intercepted request.
pub fn request_key(request: &Request) -> String {
    compute_request_key(request.method(), request.url().as_str())
}
