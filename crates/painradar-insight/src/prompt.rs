use std::fmt::Write as _;

use painradar_signals::ScoredPost;

/// Posts beyond this many are left out of the prompt.
pub const MAX_PROMPT_POSTS: usize = 30;
const TITLE_CHARS: usize = 200;

/// Builds the single user message sent to the model.
#[must_use]
pub fn build_prompt(topic: &str, posts: &[ScoredPost]) -> String {
    let mut listing = String::new();
    for (i, scored) in posts.iter().take(MAX_PROMPT_POSTS).enumerate() {
        let post = &scored.post;
        let title: String = post
            .title
            .as_deref()
            .unwrap_or(&post.content)
            .chars()
            .take(TITLE_CHARS)
            .collect();
        let _ = writeln!(
            listing,
            "{}. [{}] {} (❤ {} 💬 {})",
            i + 1,
            post.platform,
            title.replace('\n', " "),
            scored.breakdown.likes,
            scored.breakdown.comments
        );
    }

    format!(
        "You analyze user problems. Study the posts found for the topic \"{topic}\".

POSTS:
{listing}
TASK:
1. Identify 3-5 main problem CATEGORIES (for example \"Price\", \"Quality\", \"Service\").
2. For each category give the number of posts and 1-2 examples.
3. State 3-5 key INSIGHTS about what worries people most.
4. Give 2-3 RECOMMENDATIONS for a business.

RESPONSE FORMAT (strict JSON):
{{
  \"summary\": \"A 2-3 sentence summary\",
  \"categories\": [
    {{\"name\": \"Category name\", \"count\": 5, \"examples\": [\"example 1\", \"example 2\"]}}
  ],
  \"topInsights\": [\"insight 1\", \"insight 2\"],
  \"recommendations\": [\"recommendation 1\", \"recommendation 2\"]
}}

Reply with JSON ONLY, no markdown and no explanations."
    )
}

#[cfg(test)]
mod tests {
    use painradar_core::{Platform, Post};
    use painradar_signals::Scorer;

    use super::*;

    fn scored(id: usize, title: &str) -> ScoredPost {
        let mut post = Post::new(Platform::Pikabu, id.to_string(), format!("https://pikabu.ru/story/{id}"));
        post.title = Some(title.to_string());
        post.likes = Some(7);
        post.comments = Some(2);
        Scorer::default().score(post)
    }

    #[test]
    fn lists_numbered_posts_with_counters() {
        let prompt = build_prompt("couriers", &[scored(1, "Courier lost my parcel")]);
        assert!(prompt.contains("topic \"couriers\""));
        assert!(prompt.contains("1. [pikabu] Courier lost my parcel (❤ 7 💬 2)"));
        assert!(prompt.contains("\"topInsights\""));
    }

    #[test]
    fn caps_posts_and_title_length() {
        let long = "a".repeat(400);
        let posts: Vec<ScoredPost> = (0..40).map(|i| scored(i, &long)).collect();
        let prompt = build_prompt("t", &posts);
        assert!(prompt.contains("30. [pikabu]"));
        assert!(!prompt.contains("31. [pikabu]"));
        assert!(prompt.contains(&format!("{} (❤", "a".repeat(200))));
        assert!(!prompt.contains(&"a".repeat(201)));
    }
}
