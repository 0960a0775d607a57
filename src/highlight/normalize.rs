/// Check if a character belongs to the matching alphabet
///
/// Latin letters, CJK ideographs and ASCII digits are kept; whitespace,
/// punctuation and everything else is dropped before matching.
pub fn is_match_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || is_latin_letter(c) || is_cjk_ideograph(c)
}

fn is_latin_letter(c: char) -> bool {
    // U+00D7 and U+00F7 are the multiplication and division signs
    matches!(c, '\u{00C0}'..='\u{024F}') && c != '\u{00D7}' && c != '\u{00F7}'
}

fn is_cjk_ideograph(c: char) -> bool {
    matches!(
        c,
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}'
    )
}

/// Lower-case a kept character to exactly one character
///
/// Multi-char lowercase expansions keep only the first char so that every
/// kept page character maps to one normalized position.
pub fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Normalize a character if it is part of the matching alphabet
pub fn normalize_char(c: char) -> Option<char> {
    is_match_char(c).then(|| fold_char(c))
}

/// Reduce text to its normalized matching form
pub fn normalize(text: &str) -> Vec<char> {
    text.chars().filter_map(normalize_char).collect()
}

/// Same as [`normalize`] but collected into a `String`, handy for logging
pub fn normalize_to_string(text: &str) -> String {
    text.chars().filter_map(normalize_char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_match_char() {
        assert!(is_match_char('a'));
        assert!(is_match_char('Z'));
        assert!(is_match_char('7'));
        assert!(is_match_char('é'));
        assert!(is_match_char('中'));
        assert!(is_match_char('文'));
        assert!(!is_match_char(' '));
        assert!(!is_match_char('.'));
        assert!(!is_match_char('-'));
        assert!(!is_match_char('×'));
        assert!(!is_match_char('\n'));
        assert!(!is_match_char('，'));
    }

    #[test]
    fn test_normalize_strips_and_lowercases() {
        assert_eq!(
            normalize_to_string("The quick, brown FOX!"),
            "thequickbrownfox"
        );
        assert_eq!(normalize_to_string("  ... \t"), "");
        assert_eq!(normalize_to_string("深度 学习 (Deep Learning)"), "深度学习deeplearning");
    }

    #[test]
    fn test_fold_keeps_one_char() {
        // 'İ' lowercases to "i\u{307}"
        assert_eq!(fold_char('İ'), 'i');
        assert_eq!(normalize("İstanbul").len(), "İstanbul".chars().count());
    }
}
