//! Engagement and problem-language scoring.
//!
//! All scores are pure functions of a post and land in `0..=100`. Engagement
//! weighs comments three times likes and views at one hundredth, then takes a
//! log scale so one viral post cannot swamp the ranking. Problem score counts
//! distinct lexicon stems in the title and body; five stems saturate it.

use painradar_core::{Post, ProblemLexicon};

use crate::types::{ScoreBreakdown, ScoredPost};

const LIKE_WEIGHT: f64 = 1.0;
const COMMENT_WEIGHT: f64 = 3.0;
const VIEW_WEIGHT: f64 = 0.01;
const POINTS_PER_PROBLEM_WORD: usize = 20;
const ENGAGEMENT_SHARE: f64 = 0.6;
const PROBLEM_SHARE: f64 = 0.4;

#[allow(clippy::cast_precision_loss)]
fn weighted_engagement(post: &Post) -> f64 {
    post.likes.unwrap_or(0) as f64 * LIKE_WEIGHT
        + post.comments.unwrap_or(0) as f64 * COMMENT_WEIGHT
        + post.views.unwrap_or(0) as f64 * VIEW_WEIGHT
}

/// `round(min(100, log10(raw + 1) * 20))` for a positive weighted raw score, else 0.
#[must_use]
pub fn engagement_score(post: &Post) -> u8 {
    let raw = weighted_engagement(post);
    if raw <= 0.0 {
        return 0;
    }
    let scaled = ((raw + 1.0).log10() * 20.0).min(100.0).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = scaled as u8;
    score
}

/// `min(100, 20 * distinct stems)` over `title + " " + content`.
#[must_use]
pub fn problem_score(post: &Post, lexicon: &ProblemLexicon) -> u8 {
    score_from_matches(lexicon.count_matches(&post.text()))
}

fn score_from_matches(matches: usize) -> u8 {
    let points = matches.saturating_mul(POINTS_PER_PROBLEM_WORD).min(100);
    u8::try_from(points).unwrap_or(100)
}

/// `round(0.6 * engagement + 0.4 * problem)`.
#[must_use]
pub fn total_score(engagement: u8, problem: u8) -> u8 {
    let total = (f64::from(engagement) * ENGAGEMENT_SHARE + f64::from(problem) * PROBLEM_SHARE)
        .round()
        .min(100.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = total as u8;
    total
}

/// Scores posts against one lexicon.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    lexicon: ProblemLexicon,
}

impl Scorer {
    #[must_use]
    pub fn new(lexicon: ProblemLexicon) -> Self {
        Self { lexicon }
    }

    #[must_use]
    pub fn lexicon(&self) -> &ProblemLexicon {
        &self.lexicon
    }

    #[must_use]
    pub fn score(&self, post: Post) -> ScoredPost {
        let problem_words = self.lexicon.count_matches(&post.text());
        let engagement_score = engagement_score(&post);
        let problem_score = score_from_matches(problem_words);
        let breakdown = ScoreBreakdown {
            likes: post.likes.unwrap_or(0),
            comments: post.comments.unwrap_or(0),
            views: post.views.unwrap_or(0),
            problem_words,
        };
        ScoredPost {
            post,
            engagement_score,
            problem_score,
            total_score: total_score(engagement_score, problem_score),
            breakdown,
        }
    }

    /// Scores every post, keeping input order.
    #[must_use]
    pub fn score_all(&self, posts: Vec<Post>) -> Vec<ScoredPost> {
        posts.into_iter().map(|p| self.score(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use painradar_core::Platform;

    use super::*;

    fn post(likes: u64, comments: u64, views: u64) -> Post {
        let mut post = Post::new(Platform::Pikabu, "1", "https://pikabu.ru/story/1");
        post.likes = Some(likes);
        post.comments = Some(comments);
        post.views = Some(views);
        post
    }

    fn text_post(title: &str, content: &str) -> Post {
        let mut post = Post::new(Platform::Habr, "2", "https://habr.com/ru/articles/2/");
        post.title = Some(title.to_string());
        post.content = content.to_string();
        post
    }

    #[test]
    fn no_engagement_scores_zero() {
        assert_eq!(engagement_score(&Post::new(Platform::Vc, "1", "u")), 0);
        assert_eq!(engagement_score(&post(0, 0, 0)), 0);
    }

    #[test]
    fn engagement_matches_hand_computed_values() {
        // raw = 9 -> log10(10) * 20 = 20
        assert_eq!(engagement_score(&post(9, 0, 0)), 20);
        // raw = 100 + 150 + 100 = 350 -> log10(351) * 20 = 50.9
        assert_eq!(engagement_score(&post(100, 50, 10_000)), 51);
        // raw = 5 + 3 + 0.5 = 8.5 -> log10(9.5) * 20 = 19.55
        assert_eq!(engagement_score(&post(5, 1, 50)), 20);
    }

    #[test]
    fn engagement_saturates_at_hundred() {
        assert_eq!(engagement_score(&post(u64::MAX / 4, 0, 0)), 100);
        assert_eq!(engagement_score(&post(100_000, 0, 0)), 100);
    }

    #[test]
    fn engagement_is_monotonic_in_each_metric() {
        let steps = [0_u64, 1, 2, 5, 10, 99, 1_000, 50_000, 10_000_000];
        for pair in steps.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            assert!(engagement_score(&post(lo, 3, 30)) <= engagement_score(&post(hi, 3, 30)));
            assert!(engagement_score(&post(3, lo, 30)) <= engagement_score(&post(3, hi, 30)));
            assert!(engagement_score(&post(3, 3, lo)) <= engagement_score(&post(3, 3, hi)));
        }
    }

    #[test]
    fn comments_outweigh_likes() {
        assert!(engagement_score(&post(0, 10, 0)) > engagement_score(&post(10, 0, 0)));
    }

    #[test]
    fn problem_score_counts_distinct_stems() {
        let lexicon = ProblemLexicon::english();
        let p = text_post("App is broken", "I have a problem, the export is broken and I'm stuck");
        // broken, problem, stuck
        assert_eq!(problem_score(&p, &lexicon), 60);
    }

    #[test]
    fn problem_score_saturates_after_five_stems() {
        let lexicon = ProblemLexicon::english();
        let p = text_post(
            "Problem: error, crash, bug",
            "stuck with a glitch and I'm frustrated, any advice?",
        );
        assert_eq!(problem_score(&p, &lexicon), 100);
    }

    #[test]
    fn problem_score_uses_the_given_lexicon() {
        let p = text_post("Помогите, проблема с банком", "не могу войти");
        assert_eq!(problem_score(&p, &ProblemLexicon::english()), 0);
        assert_eq!(problem_score(&p, &ProblemLexicon::russian()), 60);
    }

    #[test]
    fn total_is_weighted_and_rounded() {
        assert_eq!(total_score(0, 0), 0);
        assert_eq!(total_score(100, 100), 100);
        // 0.6 * 51 + 0.4 * 20 = 38.6
        assert_eq!(total_score(51, 20), 39);
        // 0.6 * 20 + 0.4 * 0 = 12
        assert_eq!(total_score(20, 0), 12);
    }

    #[test]
    fn scoring_is_pure() {
        let scorer = Scorer::new(ProblemLexicon::english());
        let mut p = post(12, 4, 900);
        p.content = "The sync keeps failing and I can't fix it".into();
        let first = scorer.score(p.clone());
        let second = scorer.score(p);
        assert_eq!(first, second);
        assert_eq!(first.breakdown.likes, 12);
        assert_eq!(first.breakdown.problem_words, 2);
    }

    #[test]
    fn high_engagement_post_ranks_above_low_one() {
        let scorer = Scorer::default();
        let a = scorer.score(post(100, 50, 10_000));
        let b = scorer.score(post(5, 1, 50));
        assert!(a.total_score > b.total_score);
    }
}
