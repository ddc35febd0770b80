//! Stylesheet pass: `url(...)` values and `@import "..."` strings.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{quoted, unchanged, RewriteContext};

// Lower-case and word-bounded so script calls such as `new URL(` are not touched.
static CSS_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\burl\(\s*(?:"([^"]*)"|'([^']*)'|([^"'\s)][^\s)]*))\s*\)"#)
        .expect("valid CSS url regex")
});

static CSS_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)@import\s+(?:"([^"]*)"|'([^']*)')"#).expect("valid CSS import regex")
});

/// Rewrite root-relative, protocol-relative and absolute references.
pub fn rewrite_css(body: &str, ctx: &RewriteContext) -> String {
    let with_urls = CSS_URL_RE.replace_all(body, |caps: &Captures| {
        let (value, quote) = match quoted(caps, 1, 2) {
            Some((value, quote)) => (value, quote.to_string()),
            None => match caps.get(3) {
                Some(m) => (m.as_str(), String::new()),
                None => return unchanged(caps),
            },
        };
        match ctx.reference(value) {
            Some(rewritten) => format!("url({quote}{rewritten}{quote})"),
            None => unchanged(caps),
        }
    });

    CSS_IMPORT_RE
        .replace_all(&with_urls, |caps: &Captures| match quoted(caps, 1, 2) {
            Some((value, quote)) => match ctx.reference(value) {
                Some(rewritten) => format!("@import {quote}{rewritten}{quote}"),
                None => unchanged(caps),
            },
            None => unchanged(caps),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Origin, OriginCodec};

    fn ctx() -> RewriteContext {
        RewriteContext::for_origin(
            &OriginCodec::default(),
            Origin::parse("https://example.com").unwrap(),
            "/css/site.css",
        )
    }

    #[test]
    fn root_relative_and_absolute_urls() {
        let ctx = ctx();
        let t = &ctx.encoded_origin;
        let css = r#"a{background:url(/img/a.png)}b{background:url( "https://example.com/b.png" )}c{background:url('/c.png')}"#;
        let out = rewrite_css(css, &ctx);
        assert_eq!(
            out,
            format!(
                r#"a{{background:url(/r/{t}/img/a.png)}}b{{background:url("/r/{t}/b.png")}}c{{background:url('/r/{t}/c.png')}}"#
            )
        );
    }

    #[test]
    fn relative_data_and_imports() {
        let ctx = ctx();
        let t = &ctx.encoded_origin;
        let css = r#"@import "/base.css";a{background:url(img/a.png)}b{background:url(data:image/png;base64,AAAA)}"#;
        let out = rewrite_css(css, &ctx);
        assert_eq!(
            out,
            format!(
                r#"@import "/r/{t}/base.css";a{{background:url(img/a.png)}}b{{background:url(data:image/png;base64,AAAA)}}"#
            )
        );
    }

    #[test]
    fn idempotent() {
        let ctx = ctx();
        let css = "a{background:url(/x.png)}@font-face{src:url(//fonts.example.net/f.woff2)}";
        let once = rewrite_css(css, &ctx);
        assert_ne!(once, css);
        assert_eq!(rewrite_css(&once, &ctx), once);
    }
}
