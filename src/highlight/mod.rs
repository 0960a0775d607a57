pub mod char_index;
pub mod fragment;
pub mod geometry;
pub mod locator;
pub mod matcher;
pub mod normalize;
pub mod trigger;

pub use char_index::CharacterIndex;
pub use fragment::{FragmentId, LayerError, TextFragment, TextLayer, TextPosition};
pub use geometry::{HighlightRect, Rect};
pub use locator::{HighlightLocator, PageText, locate};
pub use matcher::{MatchConfig, MatchKind, MatchSpan};
pub use trigger::{Animation, Debouncer, HighlightRequest, TriggerState, ease_out_cubic};


#[cfg(test)]
mod properties {
    use proptest::prelude::*;

    use super::normalize::normalize;
    use super::testing::MockLayer;
    use super::*;

    fn word() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9]{1,9}"
    }

    fn line() -> impl Strategy<Value = String> {
        prop::collection::vec(word(), 1..8).prop_map(|words| words.join(" "))
    }

    proptest! {
        #[test]
        fn any_normalized_substring_is_found(
            lines in prop::collection::vec(line(), 1..6),
            start_seed in any::<prop::sample::Index>(),
            len_seed in any::<prop::sample::Index>(),
        ) {
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let layer = MockLayer::from_lines(&refs);
            let page: Vec<char> = normalize(&lines.join(" "));
            prop_assume!(page.len() >= 5);

            let start = start_seed.index(page.len() - 4);
            let len = 5 + len_seed.index(page.len() - start - 4);
            let query: String = page[start..start + len].iter().collect();

            let rects = HighlightLocator::default().locate(&layer, &query);
            prop_assert!(!rects.is_empty());
            prop_assert!(rects.iter().all(|r| r.width >= 1.0 && r.height >= 1.0));
        }

        #[test]
        fn short_queries_never_match(
            lines in prop::collection::vec(line(), 1..6),
            query in "[a-z0-9 .,!-]{0,12}",
        ) {
            prop_assume!(normalize(&query).len() < 5);
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let layer = MockLayer::from_lines(&refs);
            prop_assert!(HighlightLocator::default().locate(&layer, &query).is_empty());
        }

        #[test]
        fn locate_is_deterministic(
            lines in prop::collection::vec(line(), 1..6),
            query in "[a-z ]{5,20}",
        ) {
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let layer = MockLayer::from_lines(&refs);
            let locator = HighlightLocator::default();
            prop_assert_eq!(locator.locate(&layer, &query), locator.locate(&layer, &query));
        }
    }
}
