use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use vocab_utils::text_cleanup::{char_len, normalize_answer};
use vocab_utils::{AnswerMode, Word};

/// Grades a typed answer.
///
/// In [`AnswerMode::RecallTerm`] the answer must equal the term. In
/// [`AnswerMode::RecallMeaning`] it is enough for the answer to overlap one of
/// the word's meanings: equal to it, contained in it, or containing it. So for
/// `"苹果，水果"`, both `"苹果"` and `"苹"` are accepted.
pub fn judge_answer(input: &str, word: &Word, mode: AnswerMode) -> bool {
    let input = normalize_answer(input);
    if input.is_empty() {
        return false;
    }

    match mode {
        AnswerMode::RecallTerm => input == normalize_answer(&word.term),
        AnswerMode::RecallMeaning => word.meanings().iter().any(|candidate| {
            *candidate == input || candidate.contains(&input) || input.contains(candidate.as_str())
        }),
    }
}

pub const OPTION_COUNT: usize = 4;

/// Minimum number of similar-length distractors before the similarity filter
/// is used at all.
const SIMILAR_DISTRACTORS_NEEDED: usize = 3;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub enum PracticeMode {
    Spell,
    Meaning,
    Listen,
    #[default]
    Mixed,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub enum QuestionKind {
    /// Shown the meaning, choose the term.
    Spell,
    /// Shown the term, choose the meaning.
    Meaning,
    /// Hear the term, choose the term.
    Listen,
}

impl PracticeMode {
    pub fn pick_kind(self, rng: &mut impl Rng) -> QuestionKind {
        match self {
            PracticeMode::Spell => QuestionKind::Spell,
            PracticeMode::Meaning => QuestionKind::Meaning,
            PracticeMode::Listen => QuestionKind::Listen,
            PracticeMode::Mixed => *[
                QuestionKind::Spell,
                QuestionKind::Meaning,
                QuestionKind::Listen,
            ]
            .choose(rng)
            .unwrap_or(&QuestionKind::Spell),
        }
    }
}

impl QuestionKind {
    fn option_for(self, word: &Word) -> String {
        match self {
            QuestionKind::Spell | QuestionKind::Listen => word.term.trim().to_string(),
            QuestionKind::Meaning => word.meaning_native.trim().to_string(),
        }
    }

    fn prompt_for(self, word: &Word) -> String {
        match self {
            QuestionKind::Spell => word.meaning_native.trim().to_string(),
            // for listening, the prompt is the text to speak
            QuestionKind::Meaning | QuestionKind::Listen => word.term.trim().to_string(),
        }
    }

    fn length_tolerance(self) -> usize {
        match self {
            QuestionKind::Spell | QuestionKind::Listen => 2,
            QuestionKind::Meaning => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct PracticeQuestion {
    pub kind: QuestionKind,
    pub word: Word,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

pub fn build_question(
    word: &Word,
    pool: &[Word],
    mode: PracticeMode,
    rng: &mut impl Rng,
) -> PracticeQuestion {
    let kind = mode.pick_kind(rng);
    PracticeQuestion {
        kind,
        word: word.clone(),
        prompt: kind.prompt_for(word),
        options: generate_options(word, pool, kind, rng),
        correct_answer: kind.option_for(word),
    }
}

/// Up to [`OPTION_COUNT`] distinct options, one of which is the right answer,
/// in random order.
///
/// Distractors come from other words of similar length when there are enough
/// of them, then from the rest of the pool.
pub fn generate_options(
    word: &Word,
    pool: &[Word],
    kind: QuestionKind,
    rng: &mut impl Rng,
) -> Vec<String> {
    let correct = kind.option_for(word);
    let correct_len = char_len(&correct);

    let others: Vec<&Word> = pool
        .iter()
        .filter(|other| other.id != word.id && !other.archived)
        .collect();
    let similar: Vec<&Word> = others
        .iter()
        .copied()
        .filter(|other| {
            char_len(&kind.option_for(other)).abs_diff(correct_len) <= kind.length_tolerance()
        })
        .collect();

    let mut preferred = if similar.len() >= SIMILAR_DISTRACTORS_NEEDED {
        similar
    } else {
        others.clone()
    };
    preferred.shuffle(rng);

    let mut options = vec![correct];
    let mut seen = vec![normalize_answer(&options[0])];
    for other in preferred.iter().chain(others.iter()) {
        if options.len() >= OPTION_COUNT {
            break;
        }
        let option = kind.option_for(other);
        let key = normalize_answer(&option);
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        options.push(option);
    }

    options.shuffle(rng);
    options
}

pub fn judge_choice(choice: &str, question: &PracticeQuestion) -> bool {
    let choice = normalize_answer(choice);
    !choice.is_empty() && choice == normalize_answer(&question.correct_answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn word(id: &str, term: &str, meaning: &str) -> Word {
        Word::new(id, term, meaning, "wb", Utc::now())
    }

    #[test]
    fn test_judge_recall_term_is_exact() {
        let apple = word("1", "Apple", "苹果");
        assert!(judge_answer("apple", &apple, AnswerMode::RecallTerm));
        assert!(judge_answer("  APPLE ", &apple, AnswerMode::RecallTerm));
        assert!(!judge_answer("appl", &apple, AnswerMode::RecallTerm));
        assert!(!judge_answer("apples", &apple, AnswerMode::RecallTerm));
    }

    #[test]
    fn test_judge_recall_meaning_accepts_overlap() {
        let apple = word("1", "apple", "苹果，水果");
        assert!(judge_answer("苹果", &apple, AnswerMode::RecallMeaning));
        assert!(judge_answer("水果", &apple, AnswerMode::RecallMeaning));
        assert!(judge_answer("苹", &apple, AnswerMode::RecallMeaning));
        assert!(judge_answer("红苹果", &apple, AnswerMode::RecallMeaning));
        assert!(!judge_answer("橙子", &apple, AnswerMode::RecallMeaning));
    }

    #[test]
    fn test_judge_empty_input_is_wrong() {
        let apple = word("1", "apple", "苹果");
        assert!(!judge_answer("", &apple, AnswerMode::RecallMeaning));
        assert!(!judge_answer("   ", &apple, AnswerMode::RecallMeaning));
        assert!(!judge_answer("", &apple, AnswerMode::RecallTerm));
    }

    #[test]
    fn test_judge_normalizes_composition() {
        let cafe = word("1", "café", "咖啡馆");
        assert!(judge_answer("cafe\u{0301}", &cafe, AnswerMode::RecallTerm));
    }

    fn pool() -> Vec<Word> {
        vec![
            word("1", "cat", "猫"),
            word("2", "dog", "狗"),
            word("3", "cow", "奶牛"),
            word("4", "pig", "猪"),
            word("5", "elephant", "大象"),
            word("6", "hippopotamus", "河马"),
        ]
    }

    #[test]
    fn test_options_contain_answer_and_are_distinct() {
        let pool = pool();
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let options = generate_options(&pool[0], &pool, QuestionKind::Spell, &mut rng);
            assert_eq!(options.len(), OPTION_COUNT);
            assert!(options.contains(&"cat".to_string()));
            let mut deduped = options.clone();
            deduped.sort();
            deduped.dedup();
            assert_eq!(deduped.len(), options.len());
        }
    }

    #[test]
    fn test_options_prefer_similar_length() {
        // dog, cow and pig are within two characters of "cat"
        let pool = pool();
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let options = generate_options(&pool[0], &pool, QuestionKind::Spell, &mut rng);
            assert!(!options.contains(&"hippopotamus".to_string()));
            assert!(!options.contains(&"elephant".to_string()));
        }
    }

    #[test]
    fn test_options_with_tiny_pool() {
        let pool = vec![word("1", "cat", "猫"), word("2", "dog", "狗")];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut options = generate_options(&pool[0], &pool, QuestionKind::Meaning, &mut rng);
        options.sort();
        assert_eq!(options, vec!["狗".to_string(), "猫".to_string()]);
    }

    #[test]
    fn test_duplicate_meanings_are_not_repeated() {
        let pool = vec![
            word("1", "cat", "猫"),
            word("2", "kitty", "猫"),
            word("3", "dog", "狗"),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let options = generate_options(&pool[0], &pool, QuestionKind::Meaning, &mut rng);
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_build_question_and_judge_choice() {
        let pool = pool();
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let spell = build_question(&pool[1], &pool, PracticeMode::Spell, &mut rng);
        assert_eq!(spell.kind, QuestionKind::Spell);
        assert_eq!(spell.prompt, "狗");
        assert_eq!(spell.correct_answer, "dog");
        assert!(judge_choice("DOG", &spell));
        assert!(!judge_choice("cat", &spell));

        let meaning = build_question(&pool[1], &pool, PracticeMode::Meaning, &mut rng);
        assert_eq!(meaning.prompt, "dog");
        assert_eq!(meaning.correct_answer, "狗");
        assert!(meaning.options.contains(&"狗".to_string()));
    }

    #[test]
    fn test_mixed_mode_uses_every_kind() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let kinds: Vec<QuestionKind> = (0..60)
            .map(|_| PracticeMode::Mixed.pick_kind(&mut rng))
            .collect();
        assert!(kinds.contains(&QuestionKind::Spell));
        assert!(kinds.contains(&QuestionKind::Meaning));
        assert!(kinds.contains(&QuestionKind::Listen));
    }
}
