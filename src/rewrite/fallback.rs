//! Start-up fallback for pages wrapping a game in the GameDistribution SDK.
//!
//! When the SDK never fires `SDK_GAME_START`, the `#game` frame stays empty.
//! The injected watcher loads the extracted game URL after a delay unless
//! the start event arrives first, and chains any `GD_OPTIONS.onEvent` the
//! page had registered.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{quoted, RewriteContext};

/// Bundle reference that identifies the wrapper.
pub const SDK_SIGNATURE: &str = "gamedistribution-jssdk";

/// Attribute carried by the injected watcher.
pub const FALLBACK_MARKER: &str = "data-proxy-sdk-fallback";

static GAME_ELEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bid\s*=\s*(?:"game"|'game'|game[\s>/])"#).expect("valid game element regex")
});

static GAME_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bgameSrc\s*=\s*(?:"([^"]+)"|'([^']+)')"#).expect("valid gameSrc regex")
});

static BODY_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</body\s*>").expect("valid body close regex"));

const WATCHER: &str = concat!(
    "<script __MARKER__>(function(){var d=false;",
    "var t=setTimeout(function(){var f=document.getElementById(\"game\");",
    "if(f&&!f.getAttribute(\"src\")&&!d){d=true;f.setAttribute(\"src\",\"__SRC__\")}},__DELAY__);",
    "var g=window.GD_OPTIONS;if(g){var p=g.onEvent;g.onEvent=function(e){",
    "if(e&&e.name===\"SDK_GAME_START\"){d=true;clearTimeout(t)}",
    "if(typeof p===\"function\")return p.apply(this,arguments)}}})();</script>",
);

/// True when the page carries the SDK bundle and a `game` host element.
pub fn applies(body: &str) -> bool {
    body.contains(SDK_SIGNATURE) && GAME_ELEMENT_RE.is_match(body)
}

/// Insert the watcher before `</body>`, or append it. Pages without the SDK,
/// without a `gameSrc` assignment, or already carrying the watcher are
/// returned unchanged.
pub fn inject_sdk_fallback(body: &str, ctx: &RewriteContext, delay: Duration) -> String {
    if !applies(body) || body.contains(FALLBACK_MARKER) {
        return body.to_string();
    }
    let Some(src) = GAME_SRC_RE
        .captures(body)
        .and_then(|caps| quoted(&caps, 1, 2).map(|(value, _)| value.to_string()))
    else {
        return body.to_string();
    };

    let src = ctx.reference(&src).unwrap_or(src);
    tracing::debug!(game_src = %src, "Injecting SDK start-up fallback");

    let watcher = WATCHER
        .replace("__MARKER__", FALLBACK_MARKER)
        .replace("__DELAY__", &delay.as_millis().to_string())
        .replace("__SRC__", &escape_js_string(&src));

    match BODY_CLOSE_RE.find(body) {
        Some(close) => {
            let mut out = String::with_capacity(body.len() + watcher.len());
            out.push_str(&body[..close.start()]);
            out.push_str(&watcher);
            out.push_str(&body[close.start()..]);
            out
        }
        None => format!("{body}{watcher}"),
    }
}

/// Escape for a double-quoted JS string inside an HTML `<script>`.
fn escape_js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '<' => out.push_str("\\x3c"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Origin, OriginCodec};

    fn ctx() -> RewriteContext {
        RewriteContext::for_origin(
            &OriginCodec::default(),
            Origin::parse("https://html5.example.com").unwrap(),
            "/wrapper/index.html",
        )
    }

    const PAGE: &str = concat!(
        "<html><head><script src=\"https://html5.api.gamedistribution.com/main.min.js\" ",
        "id=\"gamedistribution-jssdk\"></script></head><body>",
        "<iframe id=\"game\"></iframe>",
        "<script>var gameSrc = \"https://html5.example.com/games/abc/index.html\";</script>",
        "</body></html>",
    );

    #[test]
    fn injects_before_body_close() {
        let ctx = ctx();
        let out = inject_sdk_fallback(PAGE, &ctx, Duration::from_millis(3000));
        let expected_src = ctx.link("https://html5.example.com/games/abc/index.html").unwrap();
        assert!(out.contains(FALLBACK_MARKER));
        assert!(out.contains(&format!("f.setAttribute(\"src\",\"{expected_src}\")")));
        assert!(out.contains("},3000);"));
        assert!(out.contains("SDK_GAME_START"));
        assert!(out.ends_with("</script></body></html>"));
    }

    #[test]
    fn custom_delay_and_idempotence() {
        let ctx = ctx();
        let once = inject_sdk_fallback(PAGE, &ctx, Duration::from_millis(1500));
        assert!(once.contains("},1500);"));
        assert_eq!(inject_sdk_fallback(&once, &ctx, Duration::from_millis(1500)), once);
    }

    #[test]
    fn unrelated_pages_untouched() {
        let ctx = ctx();
        let plain = "<html><body><div id=\"game\"></div></body></html>";
        assert_eq!(inject_sdk_fallback(plain, &ctx, Duration::from_secs(3)), plain);

        let no_src = PAGE.replace("gameSrc", "other");
        assert_eq!(inject_sdk_fallback(&no_src, &ctx, Duration::from_secs(3)), no_src);

        let no_host = PAGE.replace("id=\"game\"", "id=\"player\"");
        assert_eq!(inject_sdk_fallback(&no_host, &ctx, Duration::from_secs(3)), no_host);
    }

    #[test]
    fn escapes_script_breakers() {
        assert_eq!(escape_js_string(r#"a"b\c</script>"#), r#"a\"b\\c\x3c/script>"#);
    }

    #[test]
    fn appends_without_body_close() {
        let ctx = ctx();
        let page = PAGE.replace("</body></html>", "");
        let out = inject_sdk_fallback(&page, &ctx, Duration::from_secs(3));
        assert!(out.starts_with(&page));
        assert!(out.ends_with("})();</script>"));
    }
}
