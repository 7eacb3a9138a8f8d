//! URL to local path derivation.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

use super::sanitize_component;

/// Converts a resource URL into a local path under `output_dir`, preserving
/// the URL's directory structure: `output_dir / host / path segments...`.
///
/// The host (port stripped) becomes the first directory; the URL path is
/// percent-decoded and each segment sanitized independently. Root and
/// directory URLs get an `index.html` filename.
///
/// Returns `None` if the URL cannot be parsed or has no host.
pub fn url_to_local_path(url: &str, output_dir: &Path) -> Option<PathBuf> {
    let parsed = Url::parse(url).ok()?;
    let host = sanitize_component(parsed.host_str()?);

    let raw_path = parsed.path();
    let mut url_path = percent_decode_str(raw_path)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw_path.to_string());

    if url_path.is_empty() || url_path == "/" {
        url_path = "/index.html".to_string();
    }
    if url_path.ends_with('/') {
        url_path.push_str("index.html");
    }

    let mut local = output_dir.join(host);
    for segment in url_path.trim_matches('/').split('/') {
        local.push(sanitize_component(segment));
    }
    Some(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(url: &str) -> PathBuf {
        url_to_local_path(url, Path::new("out")).unwrap()
    }

    #[test]
    fn root_becomes_index_html() {
        assert_eq!(derive("http://a.com/"), Path::new("out/a.com/index.html"));
        assert_eq!(derive("http://a.com"), Path::new("out/a.com/index.html"));
    }

    #[test]
    fn directory_path_appends_index_html() {
        assert_eq!(
            derive("http://a.com/js/"),
            Path::new("out/a.com/js/index.html")
        );
    }

    #[test]
    fn nested_path_preserved() {
        assert_eq!(
            derive("https://a.com/assets/js/app.min.js"),
            Path::new("out/a.com/assets/js/app.min.js")
        );
    }

    #[test]
    fn port_stripped_from_host_dir() {
        assert_eq!(
            derive("http://a.com:8080/x.css"),
            Path::new("out/a.com/x.css")
        );
    }

    #[test]
    fn query_string_ignored() {
        assert_eq!(derive("http://a.com/x?b=1"), Path::new("out/a.com/x"));
    }

    #[test]
    fn percent_encoding_decoded() {
        assert_eq!(
            derive("http://a.com/some%20file.js"),
            Path::new("out/a.com/some file.js")
        );
    }

    #[test]
    fn segments_sanitized() {
        assert_eq!(
            derive("http://a.com/con.txt/x%3Fy"),
            Path::new("out/a.com/_con.txt/x_y")
        );
    }

    #[test]
    fn unparseable_url_is_none() {
        assert!(url_to_local_path("not a url", Path::new("out")).is_none());
        assert!(url_to_local_path("data:text/plain,hi", Path::new("out")).is_none());
    }
}
