use tracing::{debug, warn};

use crate::highlight::char_index::CharacterIndex;
use crate::highlight::fragment::{TextFragment, TextLayer, TextPosition};
use crate::highlight::geometry::{HighlightRect, Rect};
use crate::highlight::matcher::{MatchConfig, find_span};
use crate::highlight::normalize::{normalize, normalize_to_string};

/// Maps free-form text onto highlight rectangles over one rendered page
#[derive(Debug, Clone, Default)]
pub struct HighlightLocator {
    config: MatchConfig,
}

impl HighlightLocator {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Locate `query` on the page and return page-relative rectangles
    ///
    /// An empty result means "nothing to paint": the query was too short,
    /// the layer was not ready, nothing matched, or the layer failed while
    /// projecting the match.
    pub fn locate<L: TextLayer>(&self, layer: &L, query: &str) -> Vec<HighlightRect> {
        self.locate_with(layer, query, |_| {})
    }

    /// Like [`locate`](Self::locate), calling `on_match` with the first
    /// matched fragment when at least one rectangle survives
    pub fn locate_with<L, F>(&self, layer: &L, query: &str, mut on_match: F) -> Vec<HighlightRect>
    where
        L: TextLayer,
        F: FnMut(&L::Fragment),
    {
        if !layer.is_ready() {
            debug!("text layer not ready, skipping highlight");
            return Vec::new();
        }

        let Some(normalized_query) = self.normalize_query(query) else {
            return Vec::new();
        };

        let fragments = layer.fragments();
        let index = CharacterIndex::build(fragments);

        let Some(span) = find_span(index.text(), &normalized_query, &self.config) else {
            debug!(query = %normalize_to_string(query), "no match on page");
            return Vec::new();
        };

        let Some((start, last)) = index.resolve(&span) else {
            return Vec::new();
        };
        debug!(?span, ?start, ?last, "matched span");

        // Range end is one past the last matched char
        let end = TextPosition::new(last.fragment, last.offset + 1);
        let rects = match layer.range_rects(start, end) {
            Ok(rects) => rects,
            Err(e) => {
                warn!("discarding highlight: {}", e);
                return Vec::new();
            }
        };

        let page = layer.page_bounds();
        let highlights = self.project(&rects, &page);

        if !highlights.is_empty() {
            if let Some(fragment) = fragments.get(start.fragment) {
                on_match(fragment);
            }
        }

        highlights
    }

    /// Index of the first page whose text contains `query`
    ///
    /// Matches like [`locate`](Self::locate) but on plain page text, so a
    /// quoted passage can be routed to its page before that page is rendered.
    pub fn find_page<'a, I>(&self, pages: I, query: &str) -> Option<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let normalized_query = self.normalize_query(query)?;
        pages
            .into_iter()
            .position(|page| find_span(&normalize(page), &normalized_query, &self.config).is_some())
    }

    /// Normalized query, or `None` when the raw or normalized text is too short
    fn normalize_query(&self, query: &str) -> Option<Vec<char>> {
        let query = query.trim();
        if query.chars().count() < self.config.min_query_len {
            return None;
        }
        let normalized = normalize(query);
        (normalized.len() >= self.config.min_query_len).then_some(normalized)
    }

    /// Relativize client rectangles and drop degenerate or page-sized ones
    fn project(&self, rects: &[Rect], page: &Rect) -> Vec<HighlightRect> {
        rects
            .iter()
            .map(|rect| HighlightRect::from_client(rect, page))
            .filter(|rect| !rect.is_degenerate(self.config.min_rect_side))
            .filter(|rect| !rect.covers_page(page, self.config.full_page_ratio))
            .collect()
    }
}

/// A bare fragment list plus page box, usable as a [`TextLayer`]
#[derive(Debug, Clone, Copy)]
pub struct PageText<'a, F> {
    pub fragments: &'a [F],
    pub bounds: Rect,
}

impl<F: TextFragment> TextLayer for PageText<'_, F> {
    type Fragment = F;

    fn fragments(&self) -> &[F] {
        self.fragments
    }

    fn page_bounds(&self) -> Rect {
        self.bounds
    }
}

/// Locate `query` among `fragments` with the default heuristics
pub fn locate<F: TextFragment>(fragments: &[F], query: &str, page_bounds: Rect) -> Vec<HighlightRect> {
    let page = PageText {
        fragments,
        bounds: page_bounds,
    };
    HighlightLocator::default().locate(&page, query)
}
