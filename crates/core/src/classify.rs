//! Request classification.
//!
//! Maps every intercepted request to exactly one [`ResourceClass`]. The
//! classifier is pure: the same request and rules always give the same tag.

use serde::Serialize;

use crate::cache::StoreKind;
use crate::request::{Destination, Request};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "ico"];
const STATIC_EXTENSIONS: &[&str] = &["css", "js", "woff", "woff2", "ttf", "eot"];

/// Category used to route a request to a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceClass {
    Image,
    StaticAsset,
    Dynamic,
    /// Never intercepted; the host handles it untouched.
    Excluded,
}

impl ResourceClass {
    /// Store that backs this class, if it is cached at all.
    pub fn store_kind(self) -> Option<StoreKind> {
        match self {
            ResourceClass::Image => Some(StoreKind::Image),
            ResourceClass::StaticAsset => Some(StoreKind::Static),
            ResourceClass::Dynamic => Some(StoreKind::Dynamic),
            ResourceClass::Excluded => None,
        }
    }
}

/// Classification rules: which hosts and path prefixes bypass the engine.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    excluded_hosts: Vec<String>,
    excluded_path_prefixes: Vec<String>,
}

impl Classifier {
    pub fn new(excluded_hosts: Vec<String>, excluded_path_prefixes: Vec<String>) -> Self {
        let excluded_hosts = excluded_hosts
            .into_iter()
            .map(|h| h.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        let excluded_path_prefixes = excluded_path_prefixes.into_iter().filter(|p| !p.is_empty()).collect();
        Self { excluded_hosts, excluded_path_prefixes }
    }

    pub fn classify(&self, request: &Request) -> ResourceClass {
        if self.is_excluded(request) {
            return ResourceClass::Excluded;
        }

        let destination = request.destination();
        let extension = path_extension(request.url().path());
        let has_ext = |set: &[&str]| extension.as_deref().is_some_and(|ext| set.contains(&ext));

        if destination == Destination::Image || has_ext(IMAGE_EXTENSIONS) {
            return ResourceClass::Image;
        }

        if matches!(destination, Destination::Style | Destination::Script | Destination::Font)
            || has_ext(STATIC_EXTENSIONS)
        {
            return ResourceClass::StaticAsset;
        }

        ResourceClass::Dynamic
    }

    fn is_excluded(&self, request: &Request) -> bool {
        if !request.is_read() {
            return true;
        }

        let url = request.url();
        if let Some(host) = url.host_str() {
            let host = host.to_ascii_lowercase();
            let tracked = self
                .excluded_hosts
                .iter()
                .any(|h| host == *h || host.strip_suffix(h.as_str()).is_some_and(|rest| rest.ends_with('.')));
            if tracked {
                return true;
            }
        }

        let path = url.path();
        self.excluded_path_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Lower-cased extension of the last path segment, if any.
fn path_extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn classifier() -> Classifier {
        Classifier::new(
            vec!["google-analytics.com".into(), "googletagmanager.com".into()],
            vec!["/api/".into(), "/.netlify/functions/".into()],
        )
    }

    fn req(method: &str, url: &str, dest: Destination) -> Request {
        Request::new(method, Url::parse(url).unwrap(), dest)
    }

    #[test]
    fn test_non_read_is_excluded() {
        let c = classifier();
        let r = req("POST", "https://casa.example/contacto", Destination::Document);
        assert_eq!(c.classify(&r), ResourceClass::Excluded);
    }

    #[test]
    fn test_tracking_hosts_are_excluded() {
        let c = classifier();
        let r = req("GET", "https://www.google-analytics.com/collect.js", Destination::Script);
        assert_eq!(c.classify(&r), ResourceClass::Excluded);
        let r = req("GET", "https://googletagmanager.com/gtm.js", Destination::Script);
        assert_eq!(c.classify(&r), ResourceClass::Excluded);
    }

    #[test]
    fn test_lookalike_host_is_not_excluded() {
        let c = classifier();
        let r = req("GET", "https://notgoogle-analytics.com/app.js", Destination::Empty);
        assert_eq!(c.classify(&r), ResourceClass::StaticAsset);
    }

    #[test]
    fn test_api_prefix_is_excluded() {
        let c = classifier();
        let r = req("GET", "https://casa.example/api/listings?page=2", Destination::Empty);
        assert_eq!(c.classify(&r), ResourceClass::Excluded);
        let r = req("GET", "https://casa.example/.netlify/functions/lead", Destination::Empty);
        assert_eq!(c.classify(&r), ResourceClass::Excluded);
    }

    #[test]
    fn test_images_by_destination_or_extension() {
        let c = classifier();
        assert_eq!(c.classify(&req("GET", "https://casa.example/logo.PNG", Destination::Empty)), ResourceClass::Image);
        assert_eq!(c.classify(&req("GET", "https://casa.example/favicon.ico", Destination::Empty)), ResourceClass::Image);
        assert_eq!(
            c.classify(&req("GET", "https://cdn.example/render?id=4", Destination::Image)),
            ResourceClass::Image
        );
    }

    #[test]
    fn test_static_assets_by_destination_or_extension() {
        let c = classifier();
        assert_eq!(
            c.classify(&req("GET", "https://casa.example/app.css", Destination::Empty)),
            ResourceClass::StaticAsset
        );
        assert_eq!(
            c.classify(&req("GET", "https://casa.example/fonts/inter.woff2", Destination::Empty)),
            ResourceClass::StaticAsset
        );
        assert_eq!(
            c.classify(&req("GET", "https://fonts.example/css2?family=Inter", Destination::Font)),
            ResourceClass::StaticAsset
        );
    }

    #[test]
    fn test_image_destination_wins_over_static_extension() {
        let c = classifier();
        let r = req("GET", "https://casa.example/sprite.js", Destination::Image);
        assert_eq!(c.classify(&r), ResourceClass::Image);
    }

    #[test]
    fn test_everything_else_is_dynamic() {
        let c = classifier();
        assert_eq!(c.classify(&req("GET", "https://casa.example/", Destination::Document)), ResourceClass::Dynamic);
        assert_eq!(
            c.classify(&req("GET", "https://casa.example/propiedades/casa-12", Destination::Document)),
            ResourceClass::Dynamic
        );
        assert_eq!(c.classify(&req("GET", "https://casa.example/feed.xml", Destination::Empty)), ResourceClass::Dynamic);
    }

    #[test]
    fn test_extension_only_from_last_segment() {
        assert_eq!(path_extension("/img.v2/page"), None);
        assert_eq!(path_extension("/a/b.JPEG"), Some("jpeg".to_string()));
        assert_eq!(path_extension("/"), None);
    }

    #[test]
    fn test_store_kind_mapping() {
        assert_eq!(ResourceClass::Image.store_kind(), Some(StoreKind::Image));
        assert_eq!(ResourceClass::StaticAsset.store_kind(), Some(StoreKind::Static));
        assert_eq!(ResourceClass::Dynamic.store_kind(), Some(StoreKind::Dynamic));
        assert_eq!(ResourceClass::Excluded.store_kind(), None);
    }
}
