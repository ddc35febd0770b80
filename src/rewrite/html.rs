//! Markup pass.
//!
//! # Data Flow
//! ```text
//! body
//!   → src/href/action/poster attribute values
//!   → inline `.src =` / `setAttribute("src", …)` literals
//!   → protocol-relative literals
//!   → window/document.location assignments
//!   → CSP / X-Frame-Options <meta> removal
//!   → stylesheet pass (inline <style> and style="")
//!   → <base> + interceptor injection at the top of <head>
//!   → optional SDK start-up fallback before </body>
//! ```
//!
//! # Design Decisions
//! - Each step is a regex over the whole document; a reference that does not
//!   parse keeps its original text
//! - Injection is skipped when the interceptor marker is already present, so
//!   a second run over rewritten output is a no-op

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::interceptor::{self, INTERCEPTOR_MARKER};
use super::{css, fallback, js, quoted, unchanged, RewriteContext, RewriteOptions};
use crate::routing::MOUNT_PREFIX;

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(src|href|action|poster)(\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attribute regex")
});

static SCRIPT_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(\.src\s*=\s*|setAttribute\s*\(\s*["']src["']\s*,\s*)(?:"(https?://[^"\r\n]+)"|'(https?://[^'\r\n]+)')"#,
    )
    .expect("valid script src regex")
});

static LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)((?:window|document)\.location(?:\.href)?\s*=\s*)(?:"(https?://[^"\r\n]+)"|'(https?://[^'\r\n]+)')"#,
    )
    .expect("valid location regex")
});

static META_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)<meta\b[^>]*\bhttp-equiv\s*=\s*["']?\s*(?:content-security-policy(?:-report-only)?|x-frame-options)\b[^>]*>"#,
    )
    .expect("valid meta regex")
});

static HEAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("valid head regex"));

/// Rewrite a full HTML document.
pub fn rewrite_html(body: &str, ctx: &RewriteContext, options: &RewriteOptions) -> String {
    let mut out = ATTR_RE
        .replace_all(body, |caps: &Captures| {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let eq = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            match quoted(caps, 3, 4) {
                Some((value, quote)) => match ctx.reference(value) {
                    Some(rewritten) => format!("{name}{eq}{quote}{rewritten}{quote}"),
                    None => unchanged(caps),
                },
                None => unchanged(caps),
            }
        })
        .into_owned();

    out = rewrite_prefixed_literals(&SCRIPT_SRC_RE, &out, ctx);
    out = js::rewrite_protocol_relative_literals(&out, ctx);
    out = rewrite_prefixed_literals(&LOCATION_RE, &out, ctx);

    let stripped = META_RE.find_iter(&out).count();
    if stripped > 0 {
        tracing::debug!(count = stripped, "Removing embedding policy meta tags");
        out = META_RE.replace_all(&out, "").into_owned();
    }

    out = css::rewrite_css(&out, ctx);

    if !out.contains(INTERCEPTOR_MARKER) {
        out = inject_head(&out, &head_injection(ctx));
    }

    if options.sdk_fallback {
        out = fallback::inject_sdk_fallback(&out, ctx, options.sdk_fallback_delay);
    }
    out
}

/// Directory form of a rest path: a trailing file-like segment is dropped,
/// and the result always ends in `/`.
pub fn base_directory(rest_path: &str) -> String {
    if rest_path.is_empty() {
        return "/".to_string();
    }
    if rest_path.ends_with('/') {
        return rest_path.to_string();
    }
    match rest_path.rsplit_once('/') {
        Some((dir, last)) if last.contains('.') => format!("{dir}/"),
        _ => format!("{rest_path}/"),
    }
}

/// `<base>` tag followed by the interceptor script.
pub fn head_injection(ctx: &RewriteContext) -> String {
    format!(
        r#"<base href="{MOUNT_PREFIX}/{}{}">{}"#,
        ctx.encoded_origin,
        base_directory(&ctx.rest_path),
        interceptor::render(&ctx.codec)
    )
}

fn inject_head(body: &str, injection: &str) -> String {
    match HEAD_RE.find(body) {
        Some(head) => {
            let mut out = String::with_capacity(body.len() + injection.len());
            out.push_str(&body[..head.end()]);
            out.push_str(injection);
            out.push_str(&body[head.end()..]);
            out
        }
        None => format!("{injection}{body}"),
    }
}

/// Rewrite the absolute literal in groups 2/3 while keeping the prefix in group 1.
fn rewrite_prefixed_literals(re: &Regex, body: &str, ctx: &RewriteContext) -> String {
    re.replace_all(body, |caps: &Captures| {
        let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        match quoted(caps, 2, 3) {
            Some((value, quote)) => match ctx.link(value) {
                Some(link) => format!("{prefix}{quote}{link}{quote}"),
                None => unchanged(caps),
            },
            None => unchanged(caps),
        }
    })
    .into_owned()
}
