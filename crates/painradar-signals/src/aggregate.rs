//! Deduplication and popularity ordering for acquired posts.

use std::collections::{BTreeMap, HashSet};

use painradar_core::{AcquisitionResult, Platform, Post};
use painradar_scraper::extract::{collapse_whitespace, normalize_url, truncate_chars};

const FINGERPRINT_CHARS: usize = 100;

/// Keeps the first post for every URL, ignoring query string and fragment.
#[must_use]
pub fn dedupe_by_url(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|p| seen.insert(normalize_url(&p.url)))
        .collect()
}

/// Lowercased, whitespace-collapsed first 100 characters of the content.
#[must_use]
pub fn fingerprint(content: &str) -> String {
    truncate_chars(&collapse_whitespace(&content.to_lowercase()), FINGERPRINT_CHARS)
}

/// Keeps the first post for every content fingerprint. Posts with empty
/// content have no fingerprint and are always kept.
#[must_use]
pub fn dedupe_by_fingerprint(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|p| {
            let print = fingerprint(&p.content);
            print.is_empty() || seen.insert(print)
        })
        .collect()
}

/// `likes + views / 100 + comments * 10`, missing metrics counting as zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn popularity(post: &Post) -> f64 {
    post.likes.unwrap_or(0) as f64
        + post.views.unwrap_or(0) as f64 / 100.0
        + post.comments.unwrap_or(0) as f64 * 10.0
}

/// Most popular first; ties keep their original order.
pub fn sort_by_popularity(posts: &mut [Post]) {
    posts.sort_by(|a, b| popularity(b).total_cmp(&popularity(a)));
}

/// URL then fingerprint deduplication within every platform's result.
#[must_use]
pub fn dedupe_results(
    results: BTreeMap<Platform, AcquisitionResult>,
) -> BTreeMap<Platform, AcquisitionResult> {
    results
        .into_iter()
        .map(|(platform, mut result)| {
            let posts = std::mem::take(&mut result.posts);
            result.posts = dedupe_by_fingerprint(dedupe_by_url(posts));
            result.refresh();
            (platform, result)
        })
        .collect()
}

#[must_use]
pub fn sort_results_by_popularity(
    mut results: BTreeMap<Platform, AcquisitionResult>,
) -> BTreeMap<Platform, AcquisitionResult> {
    for result in results.values_mut() {
        sort_by_popularity(&mut result.posts);
        result.refresh();
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, url: &str, content: &str) -> Post {
        let mut post = Post::new(Platform::Vc, id, url);
        post.content = content.to_string();
        post
    }

    #[test]
    fn url_dedup_ignores_query_and_fragment() {
        let posts = vec![
            post("1", "https://vc.ru/1-a?utm=x", "first"),
            post("2", "https://vc.ru/1-a#comments", "second"),
            post("3", "https://vc.ru/2-b", "third"),
        ];
        let deduped = dedupe_by_url(posts);
        let ids: Vec<&str> = deduped.iter().map(|p| p.platform_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn fingerprint_dedup_catches_syndicated_copies() {
        let posts = vec![
            post("1", "https://vc.ru/1", "Банк   заблокировал карту\nбез объяснений"),
            post("2", "https://dzen.ru/a/x", "банк заблокировал карту без объяснений"),
            post("3", "https://vc.ru/3", ""),
            post("4", "https://vc.ru/4", ""),
        ];
        let deduped = dedupe_by_fingerprint(posts);
        let ids: Vec<&str> = deduped.iter().map(|p| p.platform_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "4"]);
    }

    #[test]
    fn fingerprint_only_looks_at_first_hundred_chars() {
        let head = "x".repeat(100);
        assert_eq!(fingerprint(&format!("{head} tail one")), fingerprint(&format!("{head} tail two")));
    }

    #[test]
    fn dedup_is_idempotent() {
        let posts = vec![
            post("1", "https://vc.ru/1?a=1", "same text"),
            post("2", "https://vc.ru/1", "other"),
            post("3", "https://vc.ru/3", "SAME   text"),
            post("4", "https://vc.ru/4", "unique"),
        ];
        let once = dedupe_by_fingerprint(dedupe_by_url(posts));
        let twice = dedupe_by_fingerprint(dedupe_by_url(once.clone()));
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn popularity_sort_is_descending_and_stable() {
        let mut a = post("a", "https://vc.ru/a", "");
        a.likes = Some(10);
        let mut b = post("b", "https://vc.ru/b", "");
        b.comments = Some(2);
        let mut c = post("c", "https://vc.ru/c", "");
        c.views = Some(500);
        let mut d = post("d", "https://vc.ru/d", "");
        d.likes = Some(10);

        let mut posts = vec![a, b, c, d];
        sort_by_popularity(&mut posts);
        let ids: Vec<&str> = posts.iter().map(|p| p.platform_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn result_map_dedup_refreshes_counts() {
        let mut result = AcquisitionResult::new(Platform::Vc);
        result.posts = vec![
            post("1", "https://vc.ru/1", "a"),
            post("1", "https://vc.ru/1?ref=feed", "a"),
        ];
        result.refresh();
        let mut results = BTreeMap::new();
        results.insert(Platform::Vc, result);

        let deduped = dedupe_results(results);
        let vc = &deduped[&Platform::Vc];
        assert_eq!(vc.posts.len(), 1);
        assert_eq!(vc.stats.posts_found, 1);
    }
}
