use pdfium_render::prelude::*;

use crate::highlight::{FragmentId, LayerError, Rect, TextFragment, TextLayer};

/// Threshold for considering characters on the same line (as percentage of avg char height)
const LINE_GROUPING_THRESHOLD: f64 = 0.5;

/// A character with its bounds in PDF points (origin at bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharBox {
    pub ch: char,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl CharBox {
    pub fn new(ch: char, left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            ch,
            left,
            bottom,
            right,
            top,
        }
    }

    fn height(&self) -> f64 {
        self.top - self.bottom
    }

    fn center_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    fn has_area(&self) -> bool {
        self.right > self.left && self.top > self.bottom
    }
}

/// Where a rendered page sits in the view, and how big it is
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width_pts: f64,
    pub page_height_pts: f64,
    /// Rendered width in device pixels
    pub render_width: f64,
    /// Top-left corner of the rendered page in view coordinates
    pub origin_left: f64,
    pub origin_top: f64,
}

impl PageGeometry {
    pub fn scale(&self) -> f64 {
        self.render_width / self.page_width_pts
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.origin_left,
            self.origin_top,
            self.render_width,
            self.page_height_pts * self.scale(),
        )
    }

    /// PDF coords -> view coords, flipping the y-axis
    pub fn to_view(&self, c: &CharBox) -> Rect {
        let scale = self.scale();
        Rect::new(
            self.origin_left + c.left * scale,
            self.origin_top + (self.page_height_pts - c.top) * scale,
            (c.right - c.left) * scale,
            c.height() * scale,
        )
    }
}

/// One line of rendered text with a rectangle per character
#[derive(Debug, Clone)]
pub struct LineFragment {
    id: FragmentId,
    text: String,
    /// `None` for characters without area (generated spaces)
    char_rects: Vec<Option<Rect>>,
}

impl LineFragment {
    /// Union of all character rectangles on the line
    pub fn bounds(&self) -> Option<Rect> {
        union_all(self.char_rects.iter().flatten())
    }
}

fn union_all<'a>(rects: impl Iterator<Item = &'a Rect>) -> Option<Rect> {
    rects.fold(None, |acc: Option<Rect>, r| {
        Some(match acc {
            Some(a) => a.union(r),
            None => *r,
        })
    })
}

impl TextFragment for LineFragment {
    fn id(&self) -> FragmentId {
        self.id
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn char_len(&self) -> usize {
        self.char_rects.len()
    }

    fn rects_for_range(&self, start: usize, end: usize) -> Result<Vec<Rect>, LayerError> {
        let len = self.char_rects.len();
        if start > end || end > len {
            return Err(LayerError::OffsetOutOfRange {
                fragment: self.id,
                start,
                end,
                len,
            });
        }
        Ok(union_all(self.char_rects[start..end].iter().flatten())
            .into_iter()
            .collect())
    }
}

/// The text layer of one rendered page, built from pdfium's characters
#[derive(Debug, Clone)]
pub struct PageTextLayer {
    pub page_index: usize,
    fragments: Vec<LineFragment>,
    bounds: Rect,
}

impl PageTextLayer {
    /// Build a PageTextLayer by extracting all characters from a PDF page
    pub fn build_from_page(
        page: &PdfPage,
        page_index: usize,
        origin: (f64, f64),
        render_width: f64,
    ) -> Option<Self> {
        let text_page = page.text().ok()?;
        let geometry = PageGeometry {
            page_width_pts: page.width().value as f64,
            page_height_pts: page.height().value as f64,
            render_width,
            origin_left: origin.0,
            origin_top: origin.1,
        };

        let chars: Vec<CharBox> = text_page
            .chars()
            .iter()
            .filter_map(|char_obj| {
                let ch = char_obj.unicode_char()?;
                let bounds = char_obj.tight_bounds().ok();
                Some(match bounds {
                    Some(b) => CharBox::new(
                        ch,
                        b.left().value as f64,
                        b.bottom().value as f64,
                        b.right().value as f64,
                        b.top().value as f64,
                    ),
                    None => CharBox::new(ch, 0.0, 0.0, 0.0, 0.0),
                })
            })
            .collect();

        Some(Self::from_chars(&chars, page_index, geometry))
    }

    /// Group characters into line fragments, keeping content order
    pub fn from_chars(chars: &[CharBox], page_index: usize, geometry: PageGeometry) -> Self {
        let threshold = line_threshold(chars);

        let mut fragments: Vec<LineFragment> = Vec::new();
        let mut text = String::new();
        let mut char_rects: Vec<Option<Rect>> = Vec::new();
        let mut line_y: Option<f64> = None;

        let mut flush = |text: &mut String, char_rects: &mut Vec<Option<Rect>>| {
            let trimmed_len = text.trim_end().chars().count();
            if trimmed_len > 0 {
                let mut line: String = std::mem::take(text);
                line.truncate(line.trim_end().len());
                char_rects.truncate(trimmed_len);
                fragments.push(LineFragment {
                    id: fragments.len(),
                    text: line,
                    char_rects: std::mem::take(char_rects),
                });
            }
            text.clear();
            char_rects.clear();
        };

        for c in chars {
            if c.ch == '\n' || c.ch == '\r' {
                flush(&mut text, &mut char_rects);
                line_y = None;
                continue;
            }

            if !c.has_area() {
                // Generated spaces and similar have no geometry of their own
                if !text.is_empty() {
                    text.push(c.ch);
                    char_rects.push(None);
                }
                continue;
            }

            match line_y {
                Some(y) if (c.center_y() - y).abs() <= threshold => {}
                Some(_) => {
                    flush(&mut text, &mut char_rects);
                    line_y = Some(c.center_y());
                }
                None => line_y = Some(c.center_y()),
            }

            text.push(c.ch);
            char_rects.push(Some(geometry.to_view(c)));
        }
        flush(&mut text, &mut char_rects);

        Self {
            page_index,
            fragments,
            bounds: geometry.bounds(),
        }
    }

    /// The page's text, one fragment per line
    pub fn page_text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text under a selection rectangle in view coordinates
    ///
    /// Each line contributes the run from its first to its last selected
    /// character; lines are joined with a space.
    pub fn text_in_rect(&self, selection: &Rect) -> Option<String> {
        let hit = |r: &Option<Rect>| r.as_ref().is_some_and(|r| r.intersects(selection));
        let lines: Vec<String> = self
            .fragments
            .iter()
            .filter_map(|f| {
                let first = f.char_rects.iter().position(hit)?;
                let last = f.char_rects.iter().rposition(hit)?;
                Some(f.text.chars().skip(first).take(last + 1 - first).collect())
            })
            .collect();

        let text = lines.join(" ");
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Calculate the same-line threshold from the average glyph height
fn line_threshold(chars: &[CharBox]) -> f64 {
    let heights: Vec<f64> = chars
        .iter()
        .filter(|c| c.has_area())
        .map(|c| c.height())
        .collect();
    if heights.is_empty() {
        return 0.0;
    }
    let avg_height = heights.iter().sum::<f64>() / heights.len() as f64;
    avg_height * LINE_GROUPING_THRESHOLD
}

impl TextLayer for PageTextLayer {
    type Fragment = LineFragment;

    fn fragments(&self) -> &[LineFragment] {
        &self.fragments
    }

    fn page_bounds(&self) -> Rect {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::HighlightLocator;

    const GLYPH_WIDTH: f64 = 6.0;
    const GLYPH_HEIGHT: f64 = 10.0;

    fn geometry() -> PageGeometry {
        // 500pt wide page rendered at 1000px -> scale 2
        PageGeometry {
            page_width_pts: 500.0,
            page_height_pts: 700.0,
            render_width: 1000.0,
            origin_left: 0.0,
            origin_top: 0.0,
        }
    }

    /// Lay out lines top-down with fixed-width glyphs; spaces get no area
    fn layout(lines: &[&str]) -> Vec<CharBox> {
        let mut chars = Vec::new();
        for (line_index, line) in lines.iter().enumerate() {
            let top = 650.0 - line_index as f64 * 20.0;
            for (i, ch) in line.chars().enumerate() {
                let left = 50.0 + i as f64 * GLYPH_WIDTH;
                if ch == ' ' {
                    chars.push(CharBox::new(ch, 0.0, 0.0, 0.0, 0.0));
                } else {
                    chars.push(CharBox::new(ch, left, top - GLYPH_HEIGHT, left + GLYPH_WIDTH, top));
                }
            }
            chars.push(CharBox::new('\r', 0.0, 0.0, 0.0, 0.0));
            chars.push(CharBox::new('\n', 0.0, 0.0, 0.0, 0.0));
        }
        chars
    }

    #[test]
    fn test_to_view_flips_y() {
        let c = CharBox::new('a', 50.0, 640.0, 56.0, 650.0);
        assert_eq!(geometry().to_view(&c), Rect::new(100.0, 100.0, 12.0, 20.0));
        assert_eq!(geometry().bounds(), Rect::new(0.0, 0.0, 1000.0, 1400.0));
    }

    #[test]
    fn test_lines_become_fragments() {
        let chars = layout(&["The quick brown", "fox jumps"]);
        let layer = PageTextLayer::from_chars(&chars, 0, geometry());
        let texts: Vec<&str> = layer.fragments().iter().map(|f| f.text()).collect();
        assert_eq!(texts, vec!["The quick brown", "fox jumps"]);
        assert_eq!(layer.page_text(), "The quick brown\nfox jumps");
        assert_eq!(layer.fragments()[1].id(), 1);
    }

    #[test]
    fn test_line_break_without_newline_char() {
        let mut chars = layout(&["first line"]);
        chars.retain(|c| c.ch != '\n' && c.ch != '\r');
        chars.extend(
            layout(&["", "second"])
                .into_iter()
                .filter(|c| c.ch != '\n' && c.ch != '\r'),
        );
        let layer = PageTextLayer::from_chars(&chars, 0, geometry());
        assert_eq!(layer.fragments().len(), 2);
        assert_eq!(layer.fragments()[1].text(), "second");
    }

    #[test]
    fn test_rects_for_range_unions_chars() {
        let chars = layout(&["The quick brown"]);
        let layer = PageTextLayer::from_chars(&chars, 0, geometry());
        let line = &layer.fragments()[0];

        // "quick brown" spans a space without geometry
        let rects = line.rects_for_range(4, 15).unwrap();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].left, (50.0 + 4.0 * GLYPH_WIDTH) * 2.0);
        assert_eq!(rects[0].width, 11.0 * GLYPH_WIDTH * 2.0);

        // only the space
        assert!(line.rects_for_range(3, 4).unwrap().is_empty());
        assert!(matches!(
            line.rects_for_range(10, 16),
            Err(LayerError::OffsetOutOfRange { len: 15, .. })
        ));
    }

    #[test]
    fn test_locator_over_pdf_layer() {
        let chars = layout(&["Attention is all", "you need, they said."]);
        let geometry = PageGeometry {
            origin_top: 1410.0,
            ..geometry()
        };
        let layer = PageTextLayer::from_chars(&chars, 1, geometry);

        let rects = HighlightLocator::default().locate(&layer, "all you need");
        assert_eq!(rects.len(), 2);
        // relative to the page, not the view
        assert_eq!(rects[0].top, 100.0);
        assert_eq!(rects[1].top, 140.0);
        assert_eq!(rects[1].width, 8.0 * GLYPH_WIDTH * 2.0);
    }

    #[test]
    fn test_text_in_rect_spans_lines() {
        let chars = layout(&["The quick brown", "fox jumps"]);
        let layer = PageTextLayer::from_chars(&chars, 0, geometry());

        // dragged from inside "q" on the first line to inside "s" on the second
        let selection = Rect::from_points(201.0, 150.0, 149.0, 105.0);
        assert_eq!(layer.text_in_rect(&selection).as_deref(), Some("quick jumps"));

        // a drag inside one line keeps its spaces
        let selection = Rect::from_points(101.0, 105.0, 280.0, 110.0);
        assert_eq!(layer.text_in_rect(&selection).as_deref(), Some("The quick brown"));
    }

    #[test]
    fn test_text_in_rect_outside_text() {
        let chars = layout(&["The quick brown"]);
        let layer = PageTextLayer::from_chars(&chars, 0, geometry());
        assert!(layer.text_in_rect(&Rect::new(600.0, 600.0, 50.0, 50.0)).is_none());
    }

    #[test]
    fn test_empty_page() {
        let layer = PageTextLayer::from_chars(&[], 0, geometry());
        assert!(layer.fragments().is_empty());
        assert_eq!(layer.page_text(), "");
        assert!(HighlightLocator::default().locate(&layer, "anything").is_empty());
    }
}
