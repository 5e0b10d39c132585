//! Path normalization and WebDAV href decoding
//!
//! Remote paths use a single convention everywhere in the crate: a leading
//! `/`, no trailing `/` (the root `/` being the one exception). WebDAV
//! hrefs arrive percent-encoded segment-wise and may carry XML character
//! entities; both are decoded before paths are compared or stored.

use std::borrow::Cow;

/// Normalize a remote path to the crate-wide convention.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let mut out = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Final segment of a path; empty for the root.
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Path of the containing directory; the root is its own parent.
pub fn parent_path(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => normalized[..idx].to_string(),
    }
}

/// Whether `path` equals `base` or lies underneath it.
pub fn is_within(path: &str, base: &str) -> bool {
    base == "/" || path == base || path.starts_with(&format!("{base}/"))
}

/// `path` relative to `base`, without a leading slash.
///
/// Returns `None` when `path` is not under `base`, and `Some("")` when it
/// equals `base` itself.
pub fn relative_to<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    if base == "/" {
        return Some(path.trim_start_matches('/'));
    }
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('/')
    }
}

/// Strip the server's HTTP path prefix from a WebDAV href.
///
/// A `base_path` of `/` (or an empty string) is a no-op. An href outside
/// the prefix is returned unchanged.
pub fn strip_base_path<'a>(href: &'a str, base_path: &str) -> &'a str {
    if base_path.is_empty() || base_path == "/" {
        return href;
    }
    let base = base_path.trim_end_matches('/');
    match href.strip_prefix(base) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => href,
    }
}

/// Percent-decode an href segment-wise, then decode character entities.
pub fn decode_href(href: &str) -> String {
    let decoded = href
        .split('/')
        .map(|segment| {
            urlencoding::decode(segment)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| segment.to_string())
        })
        .collect::<Vec<_>>()
        .join("/");
    decode_entities(&decoded)
}

/// Decode XML/HTML character entities (`&amp;`, `&#39;`, ...) in a path.
pub fn decode_entities(path: &str) -> String {
    match quick_xml::escape::unescape(path) {
        Ok(decoded) => decoded.into_owned(),
        // Stray ampersands are left as-is rather than rejected
        Err(_) => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_adds_leading_and_strips_trailing_slash() {
        assert_eq!(normalize_path("base/sub/"), "/base/sub");
        assert_eq!(normalize_path("/base"), "/base");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("//"), "/");
    }

    #[test]
    fn basename_and_parent() {
        assert_eq!(basename("/base/a.txt"), "a.txt");
        assert_eq!(basename("/base/sub/"), "sub");
        assert_eq!(basename("/"), "");
        assert_eq!(parent_path("/base/a.txt"), "/base");
        assert_eq!(parent_path("/base"), "/");
        assert_eq!(parent_path("/"), "/");
    }

    #[test]
    fn relative_to_requires_segment_boundary() {
        assert_eq!(relative_to("/base/a.txt", "/base"), Some("a.txt"));
        assert_eq!(relative_to("/base", "/base"), Some(""));
        assert_eq!(relative_to("/based/x", "/base"), None);
        assert_eq!(relative_to("/other/a", "/base"), None);
        assert_eq!(relative_to("/a/b", "/"), Some("a/b"));
    }

    #[test]
    fn is_within_boundaries() {
        assert!(is_within("/base/a", "/base"));
        assert!(is_within("/base", "/base"));
        assert!(is_within("/anything", "/"));
        assert!(!is_within("/based", "/base"));
    }

    #[test]
    fn strips_server_base_path() {
        assert_eq!(strip_base_path("/dav/base/a.txt", "/dav"), "/base/a.txt");
        assert_eq!(strip_base_path("/dav", "/dav"), "/");
        assert_eq!(strip_base_path("/base/a.txt", "/"), "/base/a.txt");
        assert_eq!(strip_base_path("/davenport/a", "/dav"), "/davenport/a");
    }

    #[test]
    fn decodes_percent_and_entities() {
        assert_eq!(decode_href("/base/a%20b.txt"), "/base/a b.txt");
        assert_eq!(decode_href("/base/x%2By&amp;z"), "/base/x+y&z");
        assert_eq!(decode_entities("notes &amp; drafts"), "notes & drafts");
        // Invalid encodings fall through untouched
        assert_eq!(decode_entities("a & b"), "a & b");
    }
}
