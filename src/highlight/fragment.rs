use thiserror::Error;

use crate::highlight::geometry::Rect;

pub type FragmentId = usize;

/// A character position inside a text layer
///
/// `fragment` is the fragment's index in layer order, `offset` counts chars
/// (not bytes) from the start of that fragment's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextPosition {
    pub fragment: usize,
    pub offset: usize,
}

impl TextPosition {
    pub fn new(fragment: usize, offset: usize) -> Self {
        Self { fragment, offset }
    }
}

/// Errors raised by a text layer while projecting a character range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("fragment {0} is no longer attached to the page")]
    Detached(usize),
    #[error("range {start}..{end} is out of bounds for fragment {fragment} ({len} chars)")]
    OffsetOutOfRange {
        fragment: usize,
        start: usize,
        end: usize,
        len: usize,
    },
}

/// A contiguous run of rendered text with a stable position on the page
pub trait TextFragment {
    fn id(&self) -> FragmentId;

    fn text(&self) -> &str;

    /// Client-space rectangles occupied by chars `start..end` of this fragment
    fn rects_for_range(&self, start: usize, end: usize) -> Result<Vec<Rect>, LayerError>;

    fn char_len(&self) -> usize {
        self.text().chars().count()
    }
}

/// The rendered text of one page, as supplied by the page renderer
pub trait TextLayer {
    type Fragment: TextFragment;

    /// Whether the renderer has finished laying out this page's text
    fn is_ready(&self) -> bool {
        true
    }

    /// Fragments in reading order
    fn fragments(&self) -> &[Self::Fragment];

    /// The page's own bounding box, in the same space as fragment rectangles
    fn page_bounds(&self) -> Rect;

    /// Rectangles covered by the range from `start` to `end` (end offset
    /// exclusive), which may span several fragments
    fn range_rects(&self, start: TextPosition, end: TextPosition) -> Result<Vec<Rect>, LayerError> {
        let fragments = self.fragments();
        if end.fragment >= fragments.len() {
            return Err(LayerError::Detached(end.fragment));
        }
        if start > end {
            return Err(LayerError::OffsetOutOfRange {
                fragment: start.fragment,
                start: start.offset,
                end: end.offset,
                len: fragments[start.fragment.min(end.fragment)].char_len(),
            });
        }

        let mut rects = Vec::new();
        for (index, fragment) in fragments
            .iter()
            .enumerate()
            .take(end.fragment + 1)
            .skip(start.fragment)
        {
            let from = if index == start.fragment { start.offset } else { 0 };
            let to = if index == end.fragment {
                end.offset
            } else {
                fragment.char_len()
            };
            if from == to {
                continue;
            }
            rects.extend(fragment.rects_for_range(from, to)?);
        }

        Ok(rects)
    }
}
