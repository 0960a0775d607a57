use serde::{Deserialize, Serialize};

/// Heuristic constants for matching and projection
///
/// The defaults are empirically tuned values and are kept for behavioral
/// compatibility; they are configuration, not derived invariants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Queries shorter than this (raw or normalized) never match
    pub min_query_len: usize,
    /// Upper bound on head/tail anchor length
    pub anchor_cap: usize,
    /// Anchor fallback is only tried when the anchor is longer than this
    pub min_anchor_len: usize,
    /// Max head-start to tail-end distance, as a multiple of query length
    pub max_span_factor: f64,
    /// Rectangles covering this share of both page dimensions are dropped
    pub full_page_ratio: f64,
    /// Rectangles thinner than this (device pixels) are dropped
    pub min_rect_side: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_query_len: 5,
            anchor_cap: 30,
            min_anchor_len: 5,
            max_span_factor: 1.5,
            full_page_ratio: 0.9,
            min_rect_side: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The whole query was found verbatim
    Exact,
    /// Only the head and tail anchors were found
    Anchored,
}

/// A span of the normalized page text, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    pub kind: MatchKind,
}

impl MatchSpan {
    pub fn exact(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            kind: MatchKind::Exact,
        }
    }

    pub fn anchored(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            kind: MatchKind::Anchored,
        }
    }
}

/// First occurrence of `needle` in `haystack` at or after `from`
pub fn find_from(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Locate a normalized query inside normalized page text
///
/// Tries an exact substring match first and falls back to head/tail
/// anchors when the query was paraphrased or reflowed.
pub fn find_span(page: &[char], query: &[char], config: &MatchConfig) -> Option<MatchSpan> {
    let query_len = query.len();
    if query_len < config.min_query_len {
        return None;
    }

    if let Some(start) = find_from(page, query, 0) {
        return Some(MatchSpan::exact(start, start + query_len - 1));
    }

    find_anchored(page, query, config)
}

fn find_anchored(page: &[char], query: &[char], config: &MatchConfig) -> Option<MatchSpan> {
    let query_len = query.len();
    let anchor_len = config.anchor_cap.min(query_len / 2);
    if anchor_len <= config.min_anchor_len {
        return None;
    }

    let head = &query[..anchor_len];
    let tail = &query[query_len - anchor_len..];

    let head_index = find_from(page, head, 0)?;
    let tail_index = find_from(page, tail, head_index + anchor_len)?;

    let tail_end = tail_index + anchor_len;
    let max_distance = config.max_span_factor * query_len as f64;
    if (tail_end - head_index) as f64 > max_distance {
        return None;
    }

    Some(MatchSpan::anchored(head_index, tail_end - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::normalize::normalize;

    const PAGE: &str = "thequickbrownfoxjumpsoverthelazydog";

    fn span(page: &str, query: &str) -> Option<MatchSpan> {
        find_span(&normalize(page), &normalize(query), &MatchConfig::default())
    }

    #[test]
    fn test_find_from() {
        let hay: Vec<char> = "abcabc".chars().collect();
        let needle: Vec<char> = "bc".chars().collect();
        assert_eq!(find_from(&hay, &needle, 0), Some(1));
        assert_eq!(find_from(&hay, &needle, 2), Some(4));
        assert_eq!(find_from(&hay, &needle, 5), None);
        assert_eq!(find_from(&hay, &needle, 7), None);
        assert_eq!(find_from(&hay, &[], 0), None);
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(span(PAGE, "brownfoxjumps"), Some(MatchSpan::exact(8, 20)));
        assert_eq!(span(PAGE, "Brown fox, jumps"), Some(MatchSpan::exact(8, 20)));
    }

    #[test]
    fn test_short_query_never_matches() {
        assert_eq!(span(PAGE, "quick"), Some(MatchSpan::exact(3, 7)));
        assert_eq!(span(PAGE, "fox"), None);
        assert_eq!(span(PAGE, "f-o-x!"), None);
        assert_eq!(span(PAGE, ""), None);
    }

    #[test]
    fn test_corrupted_middle_without_anchor_in_page() {
        // Head anchor "brownxyz" does not occur in the page
        assert_eq!(span(PAGE, "brownXYZfoxjumps"), None);
    }

    #[test]
    fn test_anchor_tolerates_extra_text_between_halves() {
        // head "quickbrow" at 3, tail "jumpsover" at 16
        assert_eq!(
            span(PAGE, "quick brown jumps over"),
            Some(MatchSpan::anchored(3, 24))
        );
    }

    #[test]
    fn test_anchor_skips_when_anchor_too_short() {
        // 10 chars -> anchor of 5, not longer than the minimum
        assert_eq!(span(PAGE, "quick jumps"), None);
    }

    #[test]
    fn test_anchor_on_paraphrased_long_query() {
        let page = "Attention mechanisms let the model weigh every token against all others \
                    in the sequence, which removes recurrence entirely and makes training \
                    highly parallel across positions.";
        let query = "Attention mechanisms let the model weigh every token, so recurrence is \
                     no longer needed and makes training highly parallel across positions.";
        let page_norm = normalize(page);
        let query_norm = normalize(query);
        assert!(query_norm.len() > 60);
        assert!(find_from(&page_norm, &query_norm, 0).is_none());

        let found = find_span(&page_norm, &query_norm, &MatchConfig::default())
            .expect("anchor fallback should match");
        assert_eq!(found.kind, MatchKind::Anchored);
        assert_eq!(found.start, 0);
        assert_eq!(found.end, page_norm.len() - 1);
    }

    #[test]
    fn test_anchor_rejects_distant_tail() {
        let filler = "lorem ipsum dolor sit amet ".repeat(4);
        let page = format!("quick brown {} jumps over", filler);
        assert_eq!(span(&page, "quick brown jumps over"), None);
    }

    #[test]
    fn test_anchor_rejects_missing_tail() {
        assert_eq!(span(PAGE, "quick brown leaps across"), None);
    }

    #[test]
    fn test_tail_searched_after_head() {
        // tail text appears only before the head
        let page = "jumpsover and then quickbrow";
        assert_eq!(span(page, "quickbrow jumpsover"), None);
    }

    #[test]
    fn test_config_overrides() {
        let config = MatchConfig {
            max_span_factor: 10.0,
            ..MatchConfig::default()
        };
        let filler = "lorem ipsum dolor sit amet ".repeat(4);
        let page = normalize(&format!("quick brown {} jumps over", filler));
        let query = normalize("quick brown jumps over");
        let found = find_span(&page, &query, &config).expect("wider bound should accept");
        assert_eq!(found.kind, MatchKind::Anchored);
        assert_eq!(found.end, page.len() - 1);
    }
}
