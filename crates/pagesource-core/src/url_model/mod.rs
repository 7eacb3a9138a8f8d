//! URL validation, origin comparison, and local path derivation.
//!
//! Turns resource URLs into safe local filesystem paths that mirror their
//! origin: one directory per host, URL path segments sanitized one by one,
//! extensions completed from the Content-Type header.

mod mime;
mod path;
mod sanitize;

pub use mime::infer_extension;
pub use path::url_to_local_path;
pub use sanitize::sanitize_component;

use url::Url;

use crate::error::UrlError;

/// URL schemes whose "responses" have no independently retrievable network
/// body, so capturing them is pointless.
const SKIP_PREFIXES: [&str; 6] = [
    "data:",
    "blob:",
    "about:",
    "javascript:",
    "chrome:",
    "chrome-extension:",
];

/// Validates and parses a page URL.
///
/// A missing scheme is defaulted to `https://` before validating; anything
/// without a host or with a non-http(s) scheme is rejected.
pub fn parse_page_url(input: &str) -> Result<Url, UrlError> {
    let candidate = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };

    let parsed = Url::parse(&candidate).map_err(|_| UrlError::unparseable(&candidate))?;

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::missing_host(&candidate));
    }

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(UrlError::unsupported_scheme(other)),
    }
}

/// Whether two URLs share a network location (host plus explicit port).
///
/// Schemes are deliberately ignored: an `http://` and an `https://` URL on
/// the same host count as the same origin for capture purposes.
pub fn is_same_origin(url: &str, base_url: &str) -> bool {
    let (Ok(a), Ok(b)) = (Url::parse(url), Url::parse(base_url)) else {
        return false;
    };
    a.host_str() == b.host_str() && a.port() == b.port()
}

/// Whether a response URL has a non-fetchable scheme (`data:`, `blob:`, ...).
pub fn should_skip_url(url: &str) -> bool {
    SKIP_PREFIXES.iter().any(|prefix| url.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UrlErrorKind;

    #[test]
    fn parse_page_url_accepts_http_and_https() {
        assert_eq!(
            parse_page_url("https://example.com/page").unwrap().as_str(),
            "https://example.com/page"
        );
        assert_eq!(
            parse_page_url("http://example.com").unwrap().as_str(),
            "http://example.com/"
        );
    }

    #[test]
    fn parse_page_url_defaults_missing_scheme_to_https() {
        let parsed = parse_page_url("example.com/path").unwrap();
        assert_eq!(parsed.scheme(), "https");
        assert_eq!(parsed.host_str(), Some("example.com"));
        assert_eq!(parsed.path(), "/path");
    }

    #[test]
    fn parse_page_url_rejects_missing_host() {
        let err = parse_page_url("https:///path").unwrap_err();
        assert!(matches!(
            err.kind,
            UrlErrorKind::MissingHost { .. } | UrlErrorKind::Unparseable { .. }
        ));
    }

    #[test]
    fn parse_page_url_rejects_garbage() {
        assert!(parse_page_url("http://").is_err());
        assert!(parse_page_url("").is_err());
    }

    #[test]
    fn same_origin_ignores_scheme() {
        assert!(is_same_origin("http://a.com/x", "https://a.com/y"));
    }

    #[test]
    fn same_origin_differs_by_host() {
        assert!(!is_same_origin("http://a.com", "http://b.com"));
    }

    #[test]
    fn same_origin_differs_by_explicit_port() {
        assert!(!is_same_origin("http://a.com:8080/x", "http://a.com/x"));
        assert!(is_same_origin("http://a.com:8080/x", "http://a.com:8080/y"));
    }

    #[test]
    fn skip_url_non_fetchable_schemes() {
        assert!(should_skip_url("data:image/png;base64,iVBORw0KGgo="));
        assert!(should_skip_url("blob:https://a.com/uuid"));
        assert!(should_skip_url("about:blank"));
        assert!(should_skip_url("javascript:void(0)"));
        assert!(should_skip_url("chrome://settings"));
        assert!(should_skip_url("chrome-extension://abc/script.js"));
    }

    #[test]
    fn skip_url_keeps_http() {
        assert!(!should_skip_url("https://a.com/x.js"));
        assert!(!should_skip_url("http://a.com/"));
    }
}
