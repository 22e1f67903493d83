//! Text cleanup for grading answers and comparing terms.
//!
//! Everything a learner types goes through [`normalize_answer`] before it is
//! compared with stored data, and stored data goes through the same function,
//! so both sides always agree on composition and case.

use unicode_normalization::UnicodeNormalization;

/// Normalize text for grading purposes
///
/// - Composes the text to Unicode NFC (so `e` + combining acute matches `é`)
/// - Trims surrounding whitespace
/// - Converts to lowercase
pub fn normalize_answer(text: &str) -> String {
    text.nfc().collect::<String>().trim().to_lowercase()
}

/// Returns true for the characters that separate alternative meanings in a
/// stored meaning field: ASCII and fullwidth semicolons and commas, the
/// ideographic comma, and whitespace.
pub fn is_meaning_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ';' | '；' | ',' | '，' | '、')
}

/// Split a meaning field into its normalized, non-empty candidates.
///
/// `"苹果，水果"` yields `["苹果", "水果"]`.
pub fn split_meanings(meanings: &str) -> Vec<String> {
    meanings
        .nfc()
        .collect::<String>()
        .split(is_meaning_separator)
        .map(normalize_answer)
        .filter(|candidate| !candidate.is_empty())
        .collect()
}

/// Key used to detect duplicate terms within a wordbook.
pub fn term_key(term: &str) -> String {
    normalize_answer(term)
}

/// Number of characters (not bytes) in the trimmed text.
pub fn char_len(text: &str) -> usize {
    text.trim().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  Apple "), "apple");
        assert_eq!(normalize_answer("CAFÉ"), "café");
        // decomposed é composes to the same string as the precomposed one
        assert_eq!(normalize_answer("cafe\u{0301}"), normalize_answer("café"));
        assert_eq!(normalize_answer("   "), "");
    }

    #[test]
    fn test_split_meanings() {
        assert_eq!(split_meanings("苹果，水果"), vec!["苹果", "水果"]);
        assert_eq!(
            split_meanings("猫; 小猫,猫咪、猫科 动物"),
            vec!["猫", "小猫", "猫咪", "猫科", "动物"]
        );
        assert_eq!(split_meanings("a；；b  ,, c"), vec!["a", "b", "c"]);
        assert!(split_meanings(" ;，、 ").is_empty());
    }

    #[test]
    fn test_term_key_is_case_insensitive() {
        assert_eq!(term_key(" Apple"), term_key("apple"));
        assert_ne!(term_key("apple"), term_key("apples"));
    }

    #[test]
    fn test_char_len_counts_chars() {
        assert_eq!(char_len("苹果"), 2);
        assert_eq!(char_len(" cat "), 3);
    }
}
