//! Sanitation: deterministic repair of model-generated SVG markup.
//!
//! ## Why is sanitation necessary?
//!
//! Vision models reliably produce *near*-valid SVG with a small, enumerable
//! set of defects, even when the prompt forbids them:
//!
//! - Wrapping the markup in ` ```svg ... ``` ` fences or leading prose
//!   ("Sure! Here's your diagram: …")
//! - Omitting the `xmlns` declaration or responsive sizing attributes
//! - Leaving opening tags unclosed when output is truncated
//! - Emitting bare `&` instead of `&amp;`
//!
//! The repair is layered by fidelity: a strict XML parse is attempted first
//! and, when it succeeds, the root element's attributes are normalised for
//! mobile display. When the parse fails the root tag is patched textually
//! instead — generated markup is frequently *almost* parseable and a
//! best-effort patch beats discarding the diagram. Two purely textual passes
//! (tag closure, ampersand escaping) then run on either branch's output.
//!
//! The tag-closure pass is intentionally naive: a single forward scan that
//! appends a matching close after every open tag not already followed by one.
//! It does not verify nesting order, so deeply unbalanced input can come out
//! syntactically closed but semantically tangled. The rasteriser absorbs that
//! case with its own placeholder fallback.
//!
//! [`sanitize`] never fails: any internal panic is caught and converted into
//! a fixed placeholder document carrying a visible error notice.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, error};

/// The SVG namespace injected when the model forgot to declare one.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Default view box applied when none is present: matches the 1200px-wide
/// two-zone canvas the prompt asks for.
pub const DEFAULT_VIEW_BOX: &str = "0 0 1200 800";

/// Fixed fallback document returned when repair itself fails.
const PLACEHOLDER_DOCUMENT: &str = r##"<svg width="100%" height="auto" viewBox="0 0 1200 800" xmlns="http://www.w3.org/2000/svg"><text x="100" y="100" font-size="16" fill="#000">SVG Generation Error</text></svg>"##;

/// The terminal-fallback document: percentage-sized, namespaced, and carrying
/// a single visible error notice.
pub fn placeholder_document() -> &'static str {
    PLACEHOLDER_DOCUMENT
}

/// Coerce raw model output into a well-formed, mobile-renderable SVG string.
///
/// Steps, each operating on the previous step's output:
/// 1. Trim surrounding whitespace
/// 2. Strip a leading/trailing markdown code fence (boundaries only)
/// 3. Locate the `<svg` root — discard any leading prose, or synthesise a
///    sized, namespaced wrapper when no root exists at all
/// 4. Strict XML parse: on success force the root's responsive sizing
///    attributes; on failure patch only the attributes that are missing
/// 5. Close unclosed tags, then escape bare ampersands
///
/// Never returns an error: irreparable input degrades to
/// [`placeholder_document`]. Idempotent up to structural equivalence.
pub fn sanitize(raw: &str) -> String {
    match std::panic::catch_unwind(|| repair(raw)) {
        Ok(doc) => doc,
        Err(_) => {
            error!("sanitizer panicked on input ({} bytes); returning placeholder", raw.len());
            PLACEHOLDER_DOCUMENT.to_string()
        }
    }
}

fn repair(raw: &str) -> String {
    let text = strip_code_fences(raw.trim());
    let text = text.trim();

    let doc = locate_or_wrap_root(text);

    let doc = match roxmltree::Document::parse(&doc) {
        Ok(_) => patch_root_tag(&doc, true),
        Err(e) => {
            debug!("strict parse failed ({e}); falling back to textual root patch");
            patch_root_tag(&doc, false)
        }
    };

    let doc = close_open_tags(&doc);
    escape_bare_ampersands(&doc)
}

// ── Step 2: strip markdown code fences ───────────────────────────────────────

static RE_FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```(?:svg|xml)?\s*").unwrap());
static RE_FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

fn strip_code_fences(input: &str) -> String {
    let s = RE_FENCE_OPEN.replace(input, "");
    RE_FENCE_CLOSE.replace(&s, "").into_owned()
}

// ── Step 3: locate the document root ─────────────────────────────────────────

fn locate_or_wrap_root(text: &str) -> String {
    if text.starts_with("<svg") {
        return text.to_string();
    }
    if let Some(pos) = text.find("<svg") {
        return text[pos..].to_string();
    }
    // No root anywhere: embed whatever we got inside a minimal sized wrapper.
    format!(
        r#"<svg width="100%" height="auto" viewBox="{DEFAULT_VIEW_BOX}" xmlns="{SVG_NAMESPACE}">{text}</svg>"#
    )
}

// ── Step 4: root attribute normalisation ─────────────────────────────────────

/// Matches the responsive-sizing attributes in a root tag, for removal when
/// the strict parse succeeded and their values are being forced.
static RE_SIZE_ATTRS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s(?:width|height|preserveAspectRatio)\s*=\s*(?:"[^"]*"|'[^']*')"#).unwrap()
});

/// True when the root tag already carries the named attribute. Requires
/// leading whitespace so `stroke-width=` never shadows `width=`.
fn has_attr(tag: &str, name: &str) -> bool {
    let mut pos = 0;
    while let Some(found) = tag[pos..].find(name) {
        let at = pos + found;
        let preceded_by_space = tag[..at].ends_with(|c: char| c.is_ascii_whitespace());
        let followed_by_eq = tag[at + name.len()..].trim_start().starts_with('=');
        if preceded_by_space && followed_by_eq {
            return true;
        }
        pos = at + name.len();
    }
    false
}

fn declares_namespace(tag: &str) -> bool {
    has_attr(tag, "xmlns") || tag.contains(" xmlns:")
}

/// Normalise the root tag's attribute span.
///
/// With `force` (strict parse succeeded) the sizing attributes are replaced
/// outright with the mobile-friendly values. Without it (parse failed) only
/// missing attributes are inserted, plus a default `viewBox`, so whatever the
/// model already declared is left untouched.
fn patch_root_tag(doc: &str, force: bool) -> String {
    let Some(start) = doc.find("<svg") else {
        return doc.to_string();
    };
    let Some(rel_end) = doc[start..].find('>') else {
        return doc.to_string();
    };
    let end = start + rel_end;

    let mut tag = doc[start..end].to_string();
    let self_closing = tag.trim_end().ends_with('/');
    if self_closing {
        tag.truncate(tag.trim_end().len() - 1);
    }

    if force {
        tag = RE_SIZE_ATTRS.replace_all(&tag, "").into_owned();
    }

    let mut inject = String::new();
    if force || !has_attr(&tag, "width") {
        inject.push_str(r#" width="100%""#);
    }
    if force || !has_attr(&tag, "height") {
        inject.push_str(r#" height="auto""#);
    }
    // A viewBox already present is kept on both branches; without one the
    // forced percentage sizing has nothing to scale against.
    if !has_attr(&tag, "viewBox") {
        inject.push_str(&format!(r#" viewBox="{DEFAULT_VIEW_BOX}""#));
    }
    if force || !has_attr(&tag, "preserveAspectRatio") {
        inject.push_str(r#" preserveAspectRatio="xMidYMid meet""#);
    }
    if !declares_namespace(&tag) {
        inject.push_str(&format!(r#" xmlns="{SVG_NAMESPACE}""#));
    }

    let rest_of_tag = &tag["<svg".len()..];
    let suffix = if self_closing { "/" } else { "" };
    format!(
        "{}<svg{}{}{}{}",
        &doc[..start],
        inject,
        rest_of_tag,
        suffix,
        &doc[end..]
    )
}

// ── Step 5a: tag-closure repair ──────────────────────────────────────────────

static RE_OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z][A-Za-z0-9]*)([^>]*)>").unwrap());

/// Append a closing tag after every opening tag that is neither self-closed
/// nor immediately followed by its own close.
///
/// Single pass, non-recursive: nesting order is not verified, only one close
/// per detected open is added. Unbalanced nested input can therefore come out
/// tangled; the rasteriser's fallback absorbs that case.
fn close_open_tags(doc: &str) -> String {
    RE_OPEN_TAG
        .replace_all(doc, |caps: &Captures<'_>| {
            let whole = &caps[0];
            let attrs = &caps[2];
            if attrs.trim_end().ends_with('/') {
                return whole.to_string();
            }
            let close = format!("</{}>", &caps[1]);
            let match_end = caps.get(0).map(|m| m.end()).unwrap_or(doc.len());
            if doc[match_end..].starts_with(close.as_str()) {
                whole.to_string()
            } else {
                format!("{whole}{close}")
            }
        })
        .into_owned()
}

// ── Step 5b: ampersand escaping ──────────────────────────────────────────────

/// Matches every `&`, capturing a recognised entity tail when present.
static RE_AMPERSAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(amp;|lt;|gt;|quot;|apos;)?").unwrap());

/// Replace every `&` that is not part of a recognised escape with `&amp;`.
fn escape_bare_ampersands(doc: &str) -> String {
    RE_AMPERSAND
        .replace_all(doc, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                caps[0].to_string()
            } else {
                "&amp;".to_string()
            }
        })
        .into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_clean(doc: &str) {
        assert!(doc.starts_with("<svg"), "must start with root tag: {doc:?}");
        assert!(
            doc.contains(SVG_NAMESPACE),
            "must declare the SVG namespace: {doc:?}"
        );
        // Every & must belong to a recognised escape.
        for (i, _) in doc.match_indices('&') {
            let tail = &doc[i..];
            assert!(
                ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"]
                    .iter()
                    .any(|e| tail.starts_with(e)),
                "bare ampersand at byte {i}: {doc:?}"
            );
        }
    }

    #[test]
    fn fenced_valid_svg() {
        let out = sanitize("```svg\n<svg><rect/></svg>\n```");
        assert_clean(&out);
        assert!(out.contains(r#"width="100%""#));
        assert!(out.contains(r#"height="auto""#));
        assert!(out.contains(r#"preserveAspectRatio="xMidYMid meet""#));
    }

    #[test]
    fn fence_without_language_hint() {
        let out = sanitize("```\n<svg viewBox=\"0 0 10 10\"></svg>\n```");
        assert_clean(&out);
        assert!(!out.contains("```"));
    }

    #[test]
    fn leading_prose_discarded() {
        let out = sanitize("Sure! Here's your diagram: <svg width=\"10\">X & Y</svg>");
        assert_clean(&out);
        assert!(out.starts_with("<svg"));
        assert!(out.contains("&amp;"));
        // Bare & made the strict parse fail, so the existing width survives.
        assert!(out.contains(r#"width="10""#));
    }

    #[test]
    fn prose_without_markup_gets_wrapped() {
        let out = sanitize("I could not read the question.");
        assert_clean(&out);
        assert!(out.contains("I could not read the question."));
        assert!(out.contains(&format!(r#"viewBox="{DEFAULT_VIEW_BOX}""#)));
    }

    #[test]
    fn empty_input_yields_valid_document() {
        let out = sanitize("");
        assert_clean(&out);
    }

    #[test]
    fn missing_namespace_injected_on_parse_success() {
        let out = sanitize("<svg viewBox=\"0 0 100 100\"><circle cx=\"5\" cy=\"5\" r=\"2\"/></svg>");
        assert_clean(&out);
        // The existing viewBox is preserved on the strict-parse branch.
        assert!(out.contains(r#"viewBox="0 0 100 100""#));
    }

    #[test]
    fn parse_failure_patch_adds_only_missing_attributes() {
        // Unclosed <text> breaks the strict parse.
        let out = sanitize(r#"<svg width="640" height="480"><text x="1" y="1">hi</svg>"#);
        assert_clean(&out);
        assert!(out.contains(r#"width="640""#), "existing width kept: {out}");
        assert!(out.contains(r#"height="480""#), "existing height kept: {out}");
        assert!(out.contains(&format!(r#"viewBox="{DEFAULT_VIEW_BOX}""#)));
        assert!(out.contains("</text>"));
    }

    #[test]
    fn stroke_width_does_not_shadow_width() {
        let out = sanitize(r#"<svg stroke-width="2">A & B</svg>"#);
        assert_clean(&out);
        assert!(out.contains(r#"width="100%""#), "width must be injected: {out}");
    }

    #[test]
    fn recognised_entities_untouched() {
        let out = sanitize("<svg><text>a &amp; b &lt;c&gt; &quot;d&quot; &apos;e&apos;</text></svg>");
        assert_clean(&out);
        assert!(out.contains("&amp; b &lt;c&gt;"));
        assert!(!out.contains("&amp;amp;"));
    }

    #[test]
    fn unknown_entity_gets_escaped() {
        let out = sanitize("<svg><text>x &nbsp; y</text></svg>");
        assert!(out.contains("&amp;nbsp;"));
    }

    #[test]
    fn self_closed_tags_not_doubled() {
        let out = sanitize("<svg><rect/><line /></svg>");
        assert!(!out.contains("</rect>"));
        assert!(!out.contains("</line>"));
    }

    #[test]
    fn idempotent_on_fenced_input() {
        let once = sanitize("```svg\n<svg><rect/></svg>\n```");
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn idempotent_on_malformed_input() {
        let once = sanitize(r#"here: <svg width="10"><text>A & B</svg>"#);
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn idempotent_on_prose_input() {
        let once = sanitize("no markup at all");
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn placeholder_is_itself_clean() {
        assert_clean(placeholder_document());
        roxmltree::Document::parse(placeholder_document()).expect("placeholder must parse");
    }
}
