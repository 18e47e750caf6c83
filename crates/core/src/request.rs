//! Intercepted request model.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// The only method the engine will read from or write to a store.
pub const READ_METHOD: &str = "GET";

/// Declared destination of a request, as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Style,
    Script,
    Font,
    #[default]
    #[serde(alias = "")]
    Empty,
    Other,
}

impl Destination {
    /// Parse a destination hint. Unknown non-empty values map to `Other`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" => Destination::Empty,
            "document" => Destination::Document,
            "image" => Destination::Image,
            "style" => Destination::Style,
            "script" => Destination::Script,
            "font" => Destination::Font,
            _ => Destination::Other,
        }
    }
}

/// A request intercepted from a controlled page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    url: Url,
    destination: Destination,
}

impl Request {
    /// Build a request. The method is upper-cased and the URL fragment dropped.
    pub fn new(method: &str, mut url: Url, destination: Destination) -> Self {
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url, destination }
    }

    /// Convenience constructor for a `GET` with no destination hint.
    pub fn get(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(READ_METHOD, url, Destination::Empty))
    }

    /// Replace the destination hint.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Whether this is a read the engine may cache.
    pub fn is_read(&self) -> bool {
        self.method == READ_METHOD
    }
}
