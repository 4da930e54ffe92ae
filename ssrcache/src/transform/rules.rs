//! Element rewrite rules applied by the optimize step.
//!
//! Rules run bottom-up: an element's children are rewritten before the
//! element itself, so an anchor rule sees its already-cleaned content. The
//! walk keeps its own stack, so nesting depth does not grow the call stack.

use std::sync::OnceLock;

use regex::Regex;

use super::dom::{Element, Node};

/// Attribute marking an image whose sources must be kept for indexing.
pub const SEO_MARKER: &str = "seo-tag";

/// Language set on a root element that declares none.
pub const DEFAULT_LANG: &str = "en";

pub const DEFAULT_IMG_HEIGHT: &str = "200";
pub const DEFAULT_IMG_WIDTH: &str = "150";

/// Inline style giving interactive elements a usable tap target.
pub const TAP_TARGET_STYLE: &str = "display: inline-block;min-width: 48px;min-height: 48px;";

/// How aggressively markup that only matters to a live browser is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripLevel {
    /// Third-party tracker scripts.
    ScriptBlocks,
    /// Script preload hints and pixel-only `<noscript>` fallbacks.
    Normal,
    /// Every executable script and every resource hint.
    Hardly,
}

enum Rewrite {
    Keep(Element),
    Remove,
}

/// Children of one element still being rewritten.
struct Pending {
    /// `None` for the document level.
    element: Option<Element>,
    children: std::vec::IntoIter<Node>,
    done: Vec<Node>,
}

impl Pending {
    fn new(element: Option<Element>, children: Vec<Node>) -> Self {
        Self {
            element,
            children: children.into_iter(),
            done: Vec::new(),
        }
    }
}

fn rewrite(nodes: Vec<Node>, rule: fn(Element) -> Rewrite) -> Vec<Node> {
    let mut stack = vec![Pending::new(None, nodes)];
    while let Some(top) = stack.last_mut() {
        match top.children.next() {
            Some(Node::Element(mut el)) => {
                let children = std::mem::take(&mut el.children);
                stack.push(Pending::new(Some(el), children));
            }
            Some(other) => top.done.push(other),
            None => {
                let Some(finished) = stack.pop() else {
                    break;
                };
                let Some(mut el) = finished.element else {
                    return finished.done;
                };
                el.children = finished.done;
                if let (Rewrite::Keep(el), Some(parent)) = (rule(el), stack.last_mut()) {
                    parent.done.push(Node::Element(el));
                }
            }
        }
    }
    Vec::new()
}

/// Removes the markup selected by `level`.
pub fn strip(nodes: Vec<Node>, level: StripLevel) -> Vec<Node> {
    let rule: fn(Element) -> Rewrite = match level {
        StripLevel::ScriptBlocks => strip_tracker_script,
        StripLevel::Normal => strip_hints_and_pixels,
        StripLevel::Hardly => strip_all_scripts,
    };
    rewrite(nodes, rule)
}

/// Applies the full-optimize rules: root language, image and interactive
/// element normalization.
pub fn full_optimize(nodes: Vec<Node>) -> Vec<Node> {
    rewrite(nodes, full_rule)
}

fn tracker_src_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(googletagmanager\.com|google-analytics\.com|connect\.facebook\.net|static\.hotjar\.com|doubleclick\.net|clarity\.ms)",
        )
        .expect("valid regex")
    })
}

fn tracker_inline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(gtag\s*\(|fbq\s*\(|dataLayer\.push\s*\(|hj\s*\(|_hmt\.push\s*\()")
            .expect("valid regex")
    })
}

fn generic_link_text_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Longer phrases first so "click here" is not reduced to "click".
        Regex::new(r"(?i)\b(click here|click this|right here|learn more|here|this|start|more|go)\b")
            .expect("valid regex")
    })
}

fn strip_tracker_script(el: Element) -> Rewrite {
    if el.name != "script" {
        return Rewrite::Keep(el);
    }
    let external = el
        .attr("src")
        .is_some_and(|src| tracker_src_pattern().is_match(src));
    if external || tracker_inline_pattern().is_match(&el.text_content()) {
        Rewrite::Remove
    } else {
        Rewrite::Keep(el)
    }
}

fn is_resource_hint(el: &Element) -> bool {
    el.name == "link"
        && el.attr("rel").is_some_and(|rel| {
            rel.split_ascii_whitespace().any(|r| {
                r.eq_ignore_ascii_case("preload")
                    || r.eq_ignore_ascii_case("prefetch")
                    || r.eq_ignore_ascii_case("modulepreload")
            })
        })
}

fn strip_hints_and_pixels(el: Element) -> Rewrite {
    if is_resource_hint(&el) {
        let is_script = el.attr("as").is_some_and(|a| a.eq_ignore_ascii_case("script"))
            || el.attr("rel").is_some_and(|r| r.contains("modulepreload"))
            || el.attr("href").is_some_and(|h| h.ends_with(".js"));
        return if is_script {
            Rewrite::Remove
        } else {
            Rewrite::Keep(el)
        };
    }

    if el.name == "noscript" {
        let pixel_only = el.children.iter().all(|child| match child {
            Node::Element(inner) => inner.name == "img" || inner.name == "iframe",
            Node::Text(text) => text.trim().is_empty(),
            Node::Comment(_) | Node::Doctype(_) => true,
        });
        if pixel_only {
            return Rewrite::Remove;
        }
    }

    Rewrite::Keep(el)
}

fn strip_all_scripts(el: Element) -> Rewrite {
    if el.name == "script" {
        let structured_data = el
            .attr("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("application/ld+json"));
        if !structured_data {
            return Rewrite::Remove;
        }
    }
    if is_resource_hint(&el) {
        return Rewrite::Remove;
    }
    Rewrite::Keep(el)
}

fn full_rule(el: Element) -> Rewrite {
    match el.name.as_str() {
        "html" => Rewrite::Keep(ensure_lang(el)),
        "img" => normalize_image(el),
        "a" => {
            let el = with_tap_target(el);
            match el.attr("href").map(str::trim) {
                None | Some("") => normalize_button(demote_to_button(el)),
                Some(_) => Rewrite::Keep(normalize_anchor(el)),
            }
        }
        "button" => normalize_button(with_tap_target(el)),
        "input" => normalize_input(el),
        _ => Rewrite::Keep(el),
    }
}

fn ensure_lang(mut el: Element) -> Element {
    if !el.has_attr("lang") {
        el.prepend_attr("lang", DEFAULT_LANG);
    }
    el
}

fn normalize_image(mut el: Element) -> Rewrite {
    let has_alt = el.attr("alt").is_some_and(|alt| !alt.trim().is_empty());
    if !has_alt {
        return Rewrite::Remove;
    }

    if !el.has_attr(SEO_MARKER) {
        for attr in &mut el.attrs {
            if attr.name == "src" || attr.name == "srcset" {
                attr.value = None;
            }
        }
    }

    // A missing height resets both dimensions.
    if !el.has_attr("height") {
        el.prepend_attr("height", DEFAULT_IMG_HEIGHT);
        el.prepend_attr("width", DEFAULT_IMG_WIDTH);
    } else if !el.has_attr("width") {
        el.prepend_attr("width", DEFAULT_IMG_WIDTH);
    }

    Rewrite::Keep(el)
}

fn with_tap_target(mut el: Element) -> Element {
    let style = match el.attr("style").map(str::trim) {
        Some(existing) if !existing.is_empty() => format!("{TAP_TARGET_STYLE} {existing}"),
        _ => TAP_TARGET_STYLE.to_string(),
    };
    el.prepend_attr("style", style);
    el
}

fn demote_to_button(mut el: Element) -> Element {
    el.name = "button".to_string();
    el.remove_attr("href");
    el.prepend_attr("type", "button");
    el
}

fn normalize_anchor(mut el: Element) -> Element {
    strip_generic_text(&mut el.children);

    let mut visible = visible_text(&el);
    if visible.is_empty() {
        let href = el.attr("href").unwrap_or_default().trim().to_string();
        let separator = if el.children.is_empty() { "" } else { " " };
        el.children.push(Node::Text(format!("{separator}{href}")));
        visible = href;
    }

    let stale_label = el
        .attr("aria-label")
        .is_some_and(|label| label.trim() != visible);
    if stale_label {
        el.remove_attr("aria-label");
    }
    el
}

fn normalize_button(mut el: Element) -> Rewrite {
    let visible = visible_text(&el);
    if visible.is_empty() {
        return Rewrite::Remove;
    }

    if !el.has_attr("type") {
        el.prepend_attr("type", "button");
    }

    let label = el
        .attr("aria-label")
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string);
    match label {
        Some(label) => el.children = vec![Node::Text(label)],
        None => {
            el.prepend_attr("aria-label", visible.clone());
            el.children = vec![Node::Text(visible)];
        }
    }
    Rewrite::Keep(el)
}

fn normalize_input(el: Element) -> Rewrite {
    let is_action = el.attr("type").is_some_and(|t| {
        t.eq_ignore_ascii_case("button") || t.eq_ignore_ascii_case("submit")
    });
    let has_value = el.attr("value").is_some_and(|v| !v.trim().is_empty());
    if is_action && !has_value {
        return Rewrite::Remove;
    }
    Rewrite::Keep(with_tap_target(el))
}

fn strip_generic_text(nodes: &mut [Node]) {
    let mut pending: Vec<&mut Node> = nodes.iter_mut().collect();
    while let Some(node) = pending.pop() {
        match node {
            Node::Text(text) => {
                if generic_link_text_pattern().is_match(text) {
                    *text = generic_link_text_pattern().replace_all(text, "").into_owned();
                }
            }
            Node::Element(el) => pending.extend(el.children.iter_mut()),
            Node::Comment(_) | Node::Doctype(_) => {}
        }
    }
}

/// Text content with whitespace runs collapsed and ends trimmed.
fn visible_text(el: &Element) -> String {
    el.text_content()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::dom::{parse, serialize, SerializeOptions};

    fn run(html: &str, f: fn(Vec<Node>) -> Vec<Node>) -> String {
        serialize(&f(parse(html)), SerializeOptions::default())
    }

    fn full(html: &str) -> String {
        run(html, full_optimize)
    }

    fn first_element(html: &str) -> Element {
        match full_optimize(parse(html)).into_iter().next() {
            Some(Node::Element(el)) => el,
            other => panic!("expected element, got {other:?}"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Strip levels
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn test_strip_tracker_scripts() {
        let html = concat!(
            r#"<script src="https://www.googletagmanager.com/gtag/js?id=G-1"></script>"#,
            r#"<script>window.dataLayer = []; gtag('js', new Date());</script>"#,
            r#"<script src="/app.js"></script>"#,
        );
        let out = run(html, |n| strip(n, StripLevel::ScriptBlocks));
        assert_eq!(out, r#"<script src="/app.js"></script>"#);
    }

    #[test]
    fn test_strip_normal_removes_script_hints_and_pixels() {
        let html = concat!(
            r#"<link rel="modulepreload" href="/a.js">"#,
            r#"<link rel="preload" as="font" href="/f.woff2">"#,
            r#"<noscript><img src="https://px.example/p.gif"></noscript>"#,
            r#"<noscript><p>Enable JS</p></noscript>"#,
        );
        let out = run(html, |n| strip(n, StripLevel::Normal));
        assert_eq!(
            out,
            r#"<link rel="preload" as="font" href="/f.woff2"><noscript><p>Enable JS</p></noscript>"#
        );
    }

    #[test]
    fn test_strip_hardly_keeps_structured_data() {
        let html = concat!(
            r#"<script type="application/ld+json">{"@type":"Thing"}</script>"#,
            r#"<script>boot()</script>"#,
            r#"<link rel="prefetch" href="/next.html">"#,
            r#"<link rel="stylesheet" href="/s.css">"#,
        );
        let out = run(html, |n| strip(n, StripLevel::Hardly));
        assert_eq!(
            out,
            r#"<script type="application/ld+json">{"@type":"Thing"}</script><link rel="stylesheet" href="/s.css">"#
        );
    }

    // ─────────────────────────────────────────────────────────────────────
    // Root and images
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn test_html_gets_default_lang() {
        assert_eq!(full(r#"<html class="x"></html>"#), r#"<html lang="en" class="x"></html>"#);
        assert_eq!(full(r#"<html lang="vi"></html>"#), r#"<html lang="vi"></html>"#);
    }

    #[test]
    fn test_image_without_alt_is_removed() {
        assert_eq!(full(r#"<p><img src="a.png"><img alt="  "></p>"#), "<p></p>");
    }

    #[test]
    fn test_image_sources_blanked_without_marker() {
        let el = first_element(r#"<img src="a.png" srcset="a2.png 2x" alt="A" height="10" width="20">"#);
        assert_eq!(el.attr("src"), Some(""));
        assert!(el.attrs.iter().any(|a| a.name == "src" && a.value.is_none()));
        assert_eq!(el.attr("height"), Some("10"));
        assert_eq!(el.attr("width"), Some("20"));
    }

    #[test]
    fn test_image_sources_kept_with_marker() {
        let el = first_element(r#"<img seo-tag src="a.png" alt="A" height="10" width="20">"#);
        assert_eq!(el.attr("src"), Some("a.png"));
    }

    #[test]
    fn test_missing_height_sets_both_dimensions() {
        let el = first_element(r#"<img seo-tag src="a.png" alt="A" width="99">"#);
        assert_eq!(el.attrs[0].name, "width");
        assert_eq!(el.attr("width"), Some(DEFAULT_IMG_WIDTH));
        assert_eq!(el.attr("height"), Some(DEFAULT_IMG_HEIGHT));
    }

    #[test]
    fn test_missing_width_only() {
        let el = first_element(r#"<img seo-tag alt="A" height="10">"#);
        assert_eq!(el.attr("width"), Some(DEFAULT_IMG_WIDTH));
        assert_eq!(el.attr("height"), Some("10"));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Interactive elements
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn test_anchor_without_href_becomes_button() {
        let el = first_element("<a>Open menu</a>");
        assert_eq!(el.name, "button");
        assert_eq!(el.attr("type"), Some("button"));
        assert_eq!(el.attr("aria-label"), Some("Open menu"));
        assert!(el.attr("style").unwrap().starts_with(TAP_TARGET_STYLE));
    }

    #[test]
    fn test_anchor_with_empty_href_becomes_button() {
        let el = first_element(r#"<a href="">Menu</a>"#);
        assert_eq!(el.name, "button");
        assert!(!el.has_attr("href"));
    }

    #[test]
    fn test_anchor_generic_text_is_stripped() {
        let el = first_element(r#"<a href="/docs">Click here for docs</a>"#);
        assert_eq!(el.name, "a");
        assert_eq!(el.text_content().trim(), "for docs");
    }

    #[test]
    fn test_generic_phrases_match_whole_words_only() {
        let el = first_element(r#"<a href="/g">Google Thistle</a>"#);
        assert_eq!(el.text_content(), "Google Thistle");
    }

    #[test]
    fn test_anchor_with_only_generic_text_gets_href() {
        let el = first_element(r#"<a href="/pricing">Learn more</a>"#);
        assert_eq!(el.text_content().trim(), "/pricing");
    }

    #[test]
    fn test_anchor_stale_aria_label_removed() {
        let el = first_element(r#"<a href="/x" aria-label="Something else">Pricing</a>"#);
        assert!(!el.has_attr("aria-label"));

        let el = first_element(r#"<a href="/x" aria-label="Pricing">Pricing</a>"#);
        assert_eq!(el.attr("aria-label"), Some("Pricing"));
    }

    #[test]
    fn test_empty_button_removed() {
        assert_eq!(full("<div><button><svg></svg></button></div>"), "<div></div>");
    }

    #[test]
    fn test_button_label_synthesized_from_text() {
        let el = first_element("<button><span>Add\n  to cart</span></button>");
        assert_eq!(el.attr("type"), Some("button"));
        assert_eq!(el.attr("aria-label"), Some("Add to cart"));
        assert_eq!(el.children, vec![Node::Text("Add to cart".into())]);
    }

    #[test]
    fn test_button_existing_label_replaces_content() {
        let el = first_element(r#"<button type="submit" aria-label="Search">Go!</button>"#);
        assert_eq!(el.attr("type"), Some("submit"));
        assert_eq!(el.children, vec![Node::Text("Search".into())]);
    }

    #[test]
    fn test_action_input_without_value_removed() {
        assert_eq!(full(r#"<form><input type="submit"><input type="button" value=""></form>"#), "<form></form>");
    }

    #[test]
    fn test_action_input_with_value_kept() {
        let el = first_element(r#"<input type="submit" value="Send">"#);
        assert_eq!(el.attr("value"), Some("Send"));
        assert!(el.has_attr("style"));
    }

    #[test]
    fn test_deep_nesting_is_rewritten() {
        let depth = 100_000;
        let html = format!(
            "<div>{}<a>Open</a><img src=\"t.png\">{}</div>",
            "<span>".repeat(depth),
            "</span>".repeat(depth)
        );
        let out = full(&strip_all(&html));
        assert!(out.contains(r#"<button aria-label="Open" type="button""#));
        assert!(!out.contains("t.png"));
        assert!(out.ends_with(&format!("{}</div>", "</span>".repeat(depth))));
    }

    fn strip_all(html: &str) -> String {
        run(html, |n| strip(n, StripLevel::Hardly))
    }

    #[test]
    fn test_existing_style_is_extended() {
        let el = first_element(r#"<button style="color: red">Ok</button>"#);
        assert_eq!(
            el.attr("style"),
            Some(format!("{TAP_TARGET_STYLE} color: red").as_str())
        );
    }
}
