//! Topic expansion into problem-flavoured search queries.

use painradar_core::ModifierSet;
use rand::seq::SliceRandom;
use rand::Rng;

/// Expands `topic` into at most `k` queries using the thread-local RNG.
#[must_use]
pub fn expand_queries(topic: &str, modifiers: &ModifierSet, k: usize) -> Vec<String> {
    expand_queries_with(topic, modifiers, k, &mut rand::rng())
}

/// Expands `topic` into `min(k, 1 + pool)` queries: the topic itself first,
/// then the topic prefixed by modifiers sampled without replacement from the
/// pooled categories.
#[must_use]
pub fn expand_queries_with<R: Rng + ?Sized>(
    topic: &str,
    modifiers: &ModifierSet,
    k: usize,
    rng: &mut R,
) -> Vec<String> {
    let topic = topic.trim();
    if k == 0 {
        return Vec::new();
    }
    let mut pool = modifiers.pooled();
    pool.shuffle(rng);
    std::iter::once(topic.to_string())
        .chain(
            pool.into_iter()
                .take(k - 1)
                .map(|modifier| format!("{modifier} {topic}")),
        )
        .collect()
}
