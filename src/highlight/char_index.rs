use crate::highlight::fragment::{TextFragment, TextPosition};
use crate::highlight::matcher::MatchSpan;
use crate::highlight::normalize::normalize_char;

/// Maps every normalized page character back to the fragment char it came
/// from. Rebuilt for every highlight attempt.
#[derive(Debug, Clone, Default)]
pub struct CharacterIndex {
    /// Normalized page text
    text: Vec<char>,
    /// `positions[i]` is the source of `text[i]`; strictly increasing
    positions: Vec<TextPosition>,
}

impl CharacterIndex {
    /// Build the index by walking fragments in reading order
    pub fn build<F: TextFragment>(fragments: &[F]) -> Self {
        let mut text = Vec::new();
        let mut positions = Vec::new();

        for (fragment_index, fragment) in fragments.iter().enumerate() {
            for (offset, c) in fragment.text().chars().enumerate() {
                if let Some(folded) = normalize_char(c) {
                    text.push(folded);
                    positions.push(TextPosition::new(fragment_index, offset));
                }
            }
        }

        Self { text, positions }
    }

    /// The normalized page text
    pub fn text(&self) -> &[char] {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Source position of the normalized char at `index`
    pub fn position(&self, index: usize) -> Option<TextPosition> {
        self.positions.get(index).copied()
    }

    /// Resolve an inclusive normalized span to its first and last source chars
    pub fn resolve(&self, span: &MatchSpan) -> Option<(TextPosition, TextPosition)> {
        if span.start > span.end {
            return None;
        }
        Some((self.position(span.start)?, self.position(span.end)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::testing::MockFragment;

    fn fragments() -> Vec<MockFragment> {
        vec![
            MockFragment::new(0, "The quick", 0.0, 0.0),
            MockFragment::new(1, "brown fox,", 0.0, 20.0),
            MockFragment::new(2, " ", 0.0, 40.0),
            MockFragment::new(3, "Jumps!", 0.0, 60.0),
        ]
    }

    #[test]
    fn test_build_normalized_text() {
        let index = CharacterIndex::build(&fragments());
        let text: String = index.text().iter().collect();
        assert_eq!(text, "thequickbrownfoxjumps");
        assert_eq!(index.len(), 21);
    }

    #[test]
    fn test_positions_point_at_source_chars() {
        let index = CharacterIndex::build(&fragments());
        assert_eq!(index.position(0), Some(TextPosition::new(0, 0)));
        // 'q' follows the space in "The quick"
        assert_eq!(index.position(3), Some(TextPosition::new(0, 4)));
        // 'b' starts the second fragment
        assert_eq!(index.position(8), Some(TextPosition::new(1, 0)));
        // 'j' skips the whitespace-only fragment
        assert_eq!(index.position(16), Some(TextPosition::new(3, 0)));
        assert_eq!(index.position(21), None);
    }

    #[test]
    fn test_positions_strictly_increasing() {
        let index = CharacterIndex::build(&fragments());
        let positions: Vec<_> = (0..index.len()).filter_map(|i| index.position(i)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_resolve_span() {
        let index = CharacterIndex::build(&fragments());
        let span = MatchSpan::exact(8, 20);
        assert_eq!(
            index.resolve(&span),
            Some((TextPosition::new(1, 0), TextPosition::new(3, 4)))
        );
        assert_eq!(index.resolve(&MatchSpan::exact(8, 21)), None);
    }

    #[test]
    fn test_empty_layer() {
        let index = CharacterIndex::build::<MockFragment>(&[]);
        assert!(index.is_empty());
    }
}
