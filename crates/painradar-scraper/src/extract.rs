//! Markup helpers shared by the adapters: URL normalization, length
//! heuristics, ordered metric patterns and element traversal.

use std::collections::HashSet;
use std::sync::LazyLock;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::numbers::parse_abbreviated_number;

static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+\-−–]?)\s*(\d+)").expect("valid rating regex"));

/// Parses a CSS selector known at compile time.
///
/// # Panics
///
/// Panics if `css` is not a valid selector; callers only pass literals.
#[must_use]
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector literal {css:?}: {e}"))
}

/// Strips query string and fragment.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].to_string()
}

/// Resolves `href` against `base`, returning `None` for unusable links.
#[must_use]
pub fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") || href.starts_with("mailto:") {
        return None;
    }
    let base = reqwest::Url::parse(base).ok()?;
    base.join(href).ok().map(String::from)
}

/// Percent-encodes a search query for use in a URL.
#[must_use]
pub fn encode_query(query: &str) -> String {
    utf8_percent_encode(query.trim(), NON_ALPHANUMERIC).to_string()
}

#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// True when the character count of `text` lies in `min..=max`.
#[must_use]
pub fn len_within(text: &str, min: usize, max: usize) -> bool {
    let n = text.chars().count();
    (min..=max).contains(&n)
}

/// Visible text of an element with whitespace collapsed.
#[must_use]
pub fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Text of the first descendant matching `sel`, if non-empty.
#[must_use]
pub fn first_text(el: &ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel)
        .map(|e| element_text(&e))
        .find(|t| !t.is_empty())
}

/// Attribute of the first descendant matching `sel`.
#[must_use]
pub fn first_attr(el: &ElementRef<'_>, sel: &Selector, name: &str) -> Option<String> {
    el.select(sel)
        .find_map(|e| e.value().attr(name))
        .map(str::to_string)
}

/// Walks up to `max_levels` ancestors and returns the first one matching `pred`.
pub fn climb<'a>(
    el: ElementRef<'a>,
    max_levels: usize,
    pred: impl Fn(&ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    let mut current = el;
    for _ in 0..max_levels {
        current = current.parent().and_then(ElementRef::wrap)?;
        if pred(&current) {
            return Some(current);
        }
    }
    None
}

/// True if the element's `class` attribute contains `fragment`.
#[must_use]
pub fn class_contains(el: &ElementRef<'_>, fragment: &str) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|c| c.contains(fragment))
}

/// First capture group of `re` in `text`.
#[must_use]
pub fn capture(text: &str, re: &Regex) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Tries each pattern in order; the first whose capture parses as a counter wins.
#[must_use]
pub fn first_metric(text: &str, patterns: &[&Regex]) -> Option<u64> {
    patterns
        .iter()
        .find_map(|re| capture(text, re).and_then(|raw| parse_abbreviated_number(&raw)))
}

/// Reads a score such as `+12`, `1.2K` or `−3`; negative scores count as zero likes.
#[must_use]
pub fn parse_rating(text: &str) -> Option<u64> {
    if let Some(n) = parse_abbreviated_number(text) {
        return Some(n);
    }
    let caps = RATING_RE.captures(text)?;
    let value: u64 = caps.get(2)?.as_str().parse().ok()?;
    match caps.get(1).map(|m| m.as_str()) {
        Some("-" | "−" | "–") => Some(0),
        _ => Some(value),
    }
}

/// Per-pass URL deduplication on the normalized form.
#[derive(Debug, Default)]
pub struct SeenUrls {
    seen: HashSet<String>,
}

impl SeenUrls {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the URL and reports whether it was new.
    pub fn admit(&mut self, url: &str) -> bool {
        self.seen.insert(normalize_url(url))
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    #[test]
    fn normalize_url_strips_query_and_fragment() {
        assert_eq!(
            normalize_url("https://habr.com/ru/articles/1/?utm=x#comments"),
            "https://habr.com/ru/articles/1/"
        );
        assert_eq!(normalize_url("https://a.b/c#d"), "https://a.b/c");
        assert_eq!(normalize_url("https://a.b/c"), "https://a.b/c");
    }

    #[test]
    fn absolutize_resolves_relative_links() {
        assert_eq!(
            absolutize("https://pikabu.ru/hot", "/story/a_1").as_deref(),
            Some("https://pikabu.ru/story/a_1")
        );
        assert_eq!(absolutize("https://pikabu.ru", "javascript:void(0)"), None);
        assert_eq!(absolutize("not a url", "/x"), None);
    }

    #[test]
    fn encode_query_escapes_spaces_and_cyrillic() {
        assert_eq!(encode_query("a b"), "a%20b");
        assert_eq!(encode_query("я"), "%D1%8F");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("привет", 3), "при");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn len_within_counts_chars_not_bytes() {
        assert!(len_within("привет мир", 10, 20));
        assert!(!len_within("short", 10, 20));
    }

    #[test]
    fn first_metric_takes_first_matching_pattern() {
        let views = Regex::new(r"([\d.,]+[kк]?)\s*views").unwrap();
        let reads = Regex::new(r"(\d+)\s*reads").unwrap();
        assert_eq!(first_metric("12 reads, 1.5k views", &[&views, &reads]), Some(1500));
        assert_eq!(first_metric("12 reads", &[&views, &reads]), Some(12));
        assert_eq!(first_metric("nothing", &[&views, &reads]), None);
    }

    #[test]
    fn parse_rating_handles_signs() {
        assert_eq!(parse_rating("+15"), Some(15));
        assert_eq!(parse_rating("1.2K"), Some(1200));
        assert_eq!(parse_rating("Рейтинг: 7"), Some(7));
        assert_eq!(parse_rating("−3"), Some(0));
        assert_eq!(parse_rating("n/a"), None);
    }

    #[test]
    fn seen_urls_ignores_query_variants() {
        let mut seen = SeenUrls::new();
        assert!(seen.admit("https://x.y/a?x=1"));
        assert!(!seen.admit("https://x.y/a#top"));
        assert!(seen.admit("https://x.y/b"));
    }

    #[test]
    fn climb_finds_matching_ancestor() {
        let html = Html::parse_fragment(
            r#"<article class="story"><div><p><a href="/x">link</a></p></div></article>"#,
        );
        let link = html.select(&selector("a")).next().unwrap();
        let found = climb(link, 5, |e| e.value().name() == "article").unwrap();
        assert!(class_contains(&found, "story"));
        assert!(climb(link, 1, |e| e.value().name() == "article").is_none());
    }
}
