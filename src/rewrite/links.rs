//! Proxy link construction shared by every pass.

use url::Url;

use crate::codec::{Origin, OriginCodec};
use crate::routing::MOUNT_PREFIX;

/// Schemes whose values are self-contained and never re-addressed.
const EXCLUDED_SCHEMES: [&str; 3] = ["data:", "blob:", "javascript:"];

/// True for `data:`, `blob:` and `javascript:` values.
pub fn is_excluded(value: &str) -> bool {
    let value = value.trim_start();
    EXCLUDED_SCHEMES.iter().any(|scheme| {
        value
            .get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
    })
}

/// True when the value already lives under the proxy mount.
pub fn is_proxied(value: &str) -> bool {
    value
        .strip_prefix(MOUNT_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn is_absolute_http(value: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        value
            .get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
    })
}

/// `/r/<token><path><search><hash>` for an absolute http(s) URL.
///
/// Returns `None` when the input does not parse; callers keep the original
/// text in that case.
pub fn proxy_link(codec: &OriginCodec, raw: &str) -> Option<String> {
    let raw = raw.trim();
    let url = Url::parse(raw).ok()?;
    let origin = Origin::from_url(&url).ok()?;

    // `https://host` must not grow a slash: template suffixes usually start with one.
    let path = if url.path() == "/" && !has_explicit_path(raw) {
        ""
    } else {
        url.path()
    };

    let mut link = format!("{MOUNT_PREFIX}/{}{path}", codec.encode(&origin));
    if let Some(query) = url.query() {
        link.push('?');
        link.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        link.push('#');
        link.push_str(fragment);
    }
    Some(link)
}

/// Protocol-relative `//host/path`, read as `https://host/path`.
pub fn protocol_relative_link(codec: &OriginCodec, raw: &str) -> Option<String> {
    proxy_link(codec, &format!("https:{}", raw.trim()))
}

/// Root-relative `/path` under the current origin's token.
pub fn root_relative_link(encoded_origin: &str, raw: &str) -> String {
    format!("{MOUNT_PREFIX}/{encoded_origin}{raw}")
}

/// Re-address an attribute or `url()` value, or `None` to leave it alone.
pub fn rewrite_reference(codec: &OriginCodec, encoded_origin: &str, value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || is_excluded(trimmed) || is_proxied(trimmed) {
        return None;
    }
    if trimmed.starts_with("//") {
        return protocol_relative_link(codec, trimmed);
    }
    if trimmed.starts_with('/') {
        return Some(root_relative_link(encoded_origin, trimmed));
    }
    if is_absolute_http(trimmed) {
        return proxy_link(codec, trimmed);
    }
    None
}

fn has_explicit_path(raw: &str) -> bool {
    let after_scheme = raw.split_once("://").map(|(_, rest)| rest).unwrap_or(raw);
    after_scheme
        .find(['/', '?', '#'])
        .is_some_and(|idx| after_scheme[idx..].starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(codec: &OriginCodec, origin: &str) -> String {
        codec.encode(&Origin::parse(origin).unwrap())
    }

    #[test]
    fn absolute_links() {
        let codec = OriginCodec::default();
        let t = token(&codec, "https://cdn.example.com");
        assert_eq!(
            proxy_link(&codec, "https://cdn.example.com/api").unwrap(),
            format!("/r/{t}/api")
        );
        assert_eq!(
            proxy_link(&codec, "https://cdn.example.com/dir/?a=1#top").unwrap(),
            format!("/r/{t}/dir/?a=1#top")
        );
        assert_eq!(
            proxy_link(&codec, "https://cdn.example.com").unwrap(),
            format!("/r/{t}")
        );
        assert_eq!(
            proxy_link(&codec, "https://cdn.example.com?x=1").unwrap(),
            format!("/r/{t}?x=1")
        );
        assert_eq!(
            proxy_link(&codec, "https://cdn.example.com/").unwrap(),
            format!("/r/{t}/")
        );
    }

    #[test]
    fn unparseable_links_are_none() {
        let codec = OriginCodec::default();
        assert_eq!(proxy_link(&codec, "https://"), None);
        assert_eq!(proxy_link(&codec, "https://exa mple.com/"), None);
        assert_eq!(proxy_link(&codec, "ftp://example.com/"), None);
    }

    #[test]
    fn reference_classification() {
        let codec = OriginCodec::default();
        let t = "abcd";
        assert_eq!(rewrite_reference(&codec, t, "/img/a.png").unwrap(), "/r/abcd/img/a.png");
        assert_eq!(rewrite_reference(&codec, t, "/r/abcd/img/a.png"), None);
        assert_eq!(rewrite_reference(&codec, t, "data:image/png;base64,AAAA"), None);
        assert_eq!(rewrite_reference(&codec, t, "javascript:void(0)"), None);
        assert_eq!(rewrite_reference(&codec, t, "BLOB:https://x/y"), None);
        assert_eq!(rewrite_reference(&codec, t, "img/a.png"), None);
        assert_eq!(rewrite_reference(&codec, t, "#top"), None);

        let cdn = token(&codec, "https://cdn.example.com");
        assert_eq!(
            rewrite_reference(&codec, t, "//cdn.example.com/lib.js").unwrap(),
            format!("/r/{cdn}/lib.js")
        );
        assert_eq!(
            rewrite_reference(&codec, t, "HTTPS://cdn.example.com/lib.js").unwrap(),
            format!("/r/{cdn}/lib.js")
        );
    }

    #[test]
    fn proxied_detection() {
        assert!(is_proxied("/r"));
        assert!(is_proxied("/r/abc/x"));
        assert!(!is_proxied("/robots.txt"));
    }
}
