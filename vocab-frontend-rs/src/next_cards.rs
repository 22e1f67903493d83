use rand::Rng;
use rand::seq::IndexedRandom;
use vocab_utils::proficiency::MAX_PROFICIENCY;
use vocab_utils::{QuizOrder, Word};

/// How many of the weakest words a random pick draws from.
pub const RANDOM_POOL_SIZE: usize = 20;

/// Picks the next word to quiz.
///
/// Archived words are skipped. The rest are ordered by proficiency, weakest
/// first, keeping their original order on ties. `Sequential` always takes the
/// weakest word; `Random` picks uniformly among the [`RANDOM_POOL_SIZE`]
/// weakest.
pub fn pick_next_word<'a>(
    words: impl IntoIterator<Item = &'a Word>,
    order: QuizOrder,
    rng: &mut impl Rng,
) -> Option<&'a Word> {
    let mut pool: Vec<&Word> = words.into_iter().filter(|word| !word.archived).collect();
    // `sort_by_key` is stable, so ties keep library order
    pool.sort_by_key(|word| word.proficiency.min(MAX_PROFICIENCY));

    match order {
        QuizOrder::Sequential => pool.first().copied(),
        QuizOrder::Random => {
            let head = &pool[..pool.len().min(RANDOM_POOL_SIZE)];
            head.choose(rng).copied()
        }
    }
}
