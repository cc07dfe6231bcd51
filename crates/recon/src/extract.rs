use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Code;

/// Marker, exactly four digits, then a letter-led alphanumeric suffix.
///
/// The suffix must open with a letter so a longer digit run (`12345`,
/// `12345678`) never yields a code from its first four digits. Both word
/// boundaries are checked after matching since `regex` has no look-behind.
static CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[#*]?[0-9]{4}[A-Za-z][0-9A-Za-z]*").expect("eurocode pattern is valid")
});

/// Scan `text` for Eurocodes.
///
/// Returns uppercase codes, deduplicated, in order of first appearance.
pub fn extract_codes(text: &str) -> Vec<Code> {
    let mut seen = HashSet::new();
    let mut codes = Vec::new();

    for m in CODE_RE.find_iter(text) {
        let token = m.as_str();
        let marked = token.starts_with(['#', '*']);
        // Unmarked tokens glued to a preceding letter or digit are fragments
        // of a longer word, not codes.
        if !marked && preceded_by_alphanumeric(text, m.start()) {
            continue;
        }
        // The suffix class is ASCII; a trailing non-ASCII letter or digit
        // means the match was cut out of a longer word.
        if followed_by_alphanumeric(text, m.end()) {
            continue;
        }
        let normalized = token.to_ascii_uppercase();
        if seen.insert(normalized.clone()) {
            codes.push(Code::from_normalized(normalized));
        }
    }

    tracing::debug!(candidates = codes.len(), "extracted eurocode candidates");
    codes
}

fn preceded_by_alphanumeric(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric())
}

fn followed_by_alphanumeric(text: &str, end: usize) -> bool {
    text[end..].chars().next().is_some_and(|c| c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(text: &str) -> Vec<String> {
        extract_codes(text).into_iter().map(Code::into_string).collect()
    }

    #[test]
    fn single_code() {
        assert_eq!(strs("2448AGNMV1B"), vec!["2448AGNMV1B"]);
    }

    #[test]
    fn marked_codes_in_order() {
        assert_eq!(
            strs("#2448AGNMV1B *7293AGAMV"),
            vec!["#2448AGNMV1B", "*7293AGAMV"]
        );
    }

    #[test]
    fn five_digit_run_is_not_a_code() {
        assert!(strs("no codes here 12345").is_empty());
    }

    #[test]
    fn eight_digit_run_is_not_a_code() {
        assert!(strs("lot 12345678 batch").is_empty());
        assert!(strs("12345678AB").is_empty());
    }

    #[test]
    fn digits_glued_to_a_word_are_rejected() {
        assert!(strs("X2448AGNMV").is_empty());
        assert!(strs("ref92448AGN").is_empty());
    }

    #[test]
    fn codes_glued_to_accented_letters_are_rejected() {
        assert!(strs("2448AGNé 6340ÄB").is_empty());
        assert!(strs("#2448AGNÉ").is_empty());
        assert_eq!(strs("2448AGN é 6340AB"), vec!["2448AGN", "6340AB"]);
        assert_eq!(strs("vidro 2448AGN, Citroën"), vec!["2448AGN"]);
    }

    #[test]
    fn empty_and_codeless_text() {
        assert!(strs("").is_empty());
        assert!(strs("SEKURIT  DOT 123  M2 E6 43R-001").is_empty());
    }

    #[test]
    fn lowercase_is_normalized() {
        assert_eq!(strs("ref: 6340agav1c"), vec!["6340AGAV1C"]);
    }

    #[test]
    fn duplicates_keep_first_position() {
        assert_eq!(
            strs("6340AGAV1C 2448AGN 6340agav1c"),
            vec!["6340AGAV1C", "2448AGN"]
        );
    }

    #[test]
    fn marker_variants_are_distinct_codes() {
        assert_eq!(strs("6340AGAV1C #6340AGAV1C"), vec!["6340AGAV1C", "#6340AGAV1C"]);
    }

    #[test]
    fn punctuation_and_newlines_are_boundaries() {
        assert_eq!(
            strs("EUROCODE:2448AGNMV1B\n(*7293AGAMV)"),
            vec!["2448AGNMV1B", "*7293AGAMV"]
        );
    }
}
