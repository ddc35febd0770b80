//! Standalone script pass.
//!
//! # Responsibilities
//! - Neutralize known anti-embedding guards in third-party bundles
//! - Re-address protocol-relative and absolute string literals
//! - Re-address the URL prefix of template literals
//!
//! # Design Decisions
//! - Pattern matching over raw text, no JS parse
//! - Guards are replaced by `false` or `void 0` so the surrounding
//!   expression stays syntactically valid

use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};

use super::{quoted, unchanged, RewriteContext};

/// Known domain-lock guards and their neutral replacements, applied in order.
static GUARDS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (
            r"(?i)window\.location\.href\s*=\s*[^;]*blocked\.html[^;]*;",
            "void 0;",
        ),
        (
            r"[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*\.bloc_gard\s*&&\s*!0\s*===\s*[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*\.bloc_gard\.enabled",
            "false",
        ),
        (
            r#""to-blocked-page"\s*===\s*[\w$]+\s*&&\s*this\._redirectToBlocking\([^)]*\)"#,
            "false",
        ),
        (r"this\._redirectToBlocking\([^)]*\)", "void 0"),
        (r"this\._blockDirectTokenURLEmbedding\(\)\.blocked", "false"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid guard regex"), replacement))
    .collect()
});

/// `"//host.tld/..."` or `'//host.tld/...'`.
pub(crate) static PROTOCOL_RELATIVE_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#""(//[a-zA-Z0-9][-a-zA-Z0-9.]*\.[a-zA-Z]{2,}/[^"\r\n]*)"|'(//[a-zA-Z0-9][-a-zA-Z0-9.]*\.[a-zA-Z]{2,}/[^'\r\n]*)'"#,
    )
    .expect("valid protocol-relative literal regex")
});

static ABSOLUTE_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"(https?://[^"\r\n]+)"|'(https?://[^'\r\n]+)'"#)
        .expect("valid absolute literal regex")
});

static TEMPLATE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)`(https?://[^`$]+)").expect("valid template literal regex")
});

/// Rewrite a standalone script body.
pub fn rewrite_js(body: &str, ctx: &RewriteContext) -> String {
    let mut out = neutralize_guards(body);
    out = rewrite_protocol_relative_literals(&out, ctx);
    out = ABSOLUTE_LITERAL_RE
        .replace_all(&out, |caps: &Captures| match quoted(caps, 1, 2) {
            Some((value, quote)) => match ctx.link(value) {
                Some(link) => format!("{quote}{link}{quote}"),
                None => unchanged(caps),
            },
            None => unchanged(caps),
        })
        .into_owned();
    TEMPLATE_PREFIX_RE
        .replace_all(&out, |caps: &Captures| {
            let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            match ctx.link(prefix) {
                Some(link) => format!("`{link}"),
                None => unchanged(caps),
            }
        })
        .into_owned()
}

/// Replace every known guard with its neutral form.
pub fn neutralize_guards(body: &str) -> String {
    let mut out = body.to_string();
    for (pattern, replacement) in GUARDS.iter() {
        if pattern.is_match(&out) {
            tracing::debug!(pattern = %pattern.as_str(), "Neutralizing embedding guard");
            out = pattern.replace_all(&out, NoExpand(replacement)).into_owned();
        }
    }
    out
}

/// Shared with the inline-script part of the HTML pass.
pub(crate) fn rewrite_protocol_relative_literals(body: &str, ctx: &RewriteContext) -> String {
    PROTOCOL_RELATIVE_LITERAL_RE
        .replace_all(body, |caps: &Captures| match quoted(caps, 1, 2) {
            Some((value, quote)) => match super::links::protocol_relative_link(&ctx.codec, value) {
                Some(link) => format!("{quote}{link}{quote}"),
                None => unchanged(caps),
            },
            None => unchanged(caps),
        })
        .into_owned()
}
