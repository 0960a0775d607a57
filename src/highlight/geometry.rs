use serde::{Deserialize, Serialize};

/// A rectangle in client space (the coordinate space shared by text
/// fragments and the page's own bounding box)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rectangle spanned by two corner points, in either order
    pub fn from_points(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Rect::new(x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Whether the two rectangles share any area
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }
}

/// A highlight rectangle relative to the page's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HighlightRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl HighlightRect {
    /// Relativize a client-space rectangle against the page's bounding box
    pub fn from_client(rect: &Rect, page: &Rect) -> Self {
        Self {
            left: rect.left - page.left,
            top: rect.top - page.top,
            width: rect.width,
            height: rect.height,
        }
    }

    /// Width or height below `min_side` device pixels
    pub fn is_degenerate(&self, min_side: f64) -> bool {
        self.width < min_side || self.height < min_side
    }

    /// Covers at least `ratio` of both page dimensions
    pub fn covers_page(&self, page: &Rect, ratio: f64) -> bool {
        self.width >= page.width * ratio && self.height >= page.height * ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_client_subtracts_page_origin() {
        let page = Rect::new(20.0, 1010.0, 1000.0, 1400.0);
        let rect = Rect::new(120.0, 1110.0, 50.0, 12.0);
        let hl = HighlightRect::from_client(&rect, &page);
        assert_eq!(hl, HighlightRect {
            left: 100.0,
            top: 100.0,
            width: 50.0,
            height: 12.0,
        });
    }

    #[test]
    fn test_union() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, -5.0, 10.0, 10.0);
        assert_eq!(a.union(&b), Rect::new(0.0, -5.0, 15.0, 15.0));
    }

    #[test]
    fn test_from_points_any_drag_direction() {
        let forward = Rect::from_points(10.0, 20.0, 60.0, 45.0);
        let backward = Rect::from_points(60.0, 45.0, 10.0, 20.0);
        assert_eq!(forward, Rect::new(10.0, 20.0, 50.0, 25.0));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_intersects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 10.0, 10.0)));
        // touching edges share no area
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 5.0, 5.0)));
        assert!(!a.intersects(&Rect::new(0.0, 20.0, 5.0, 5.0)));
    }

    #[test]
    fn test_filters() {
        let page = Rect::new(0.0, 0.0, 1000.0, 1000.0);
        let thin = HighlightRect {
            left: 0.0,
            top: 0.0,
            width: 40.0,
            height: 0.5,
        };
        assert!(thin.is_degenerate(1.0));

        let whole = HighlightRect {
            left: 0.0,
            top: 0.0,
            width: 900.0,
            height: 950.0,
        };
        assert!(whole.covers_page(&page, 0.9));

        // A full-width line is still a legitimate highlight
        let line = HighlightRect {
            left: 0.0,
            top: 0.0,
            width: 990.0,
            height: 14.0,
        };
        assert!(!line.covers_page(&page, 0.9));
        assert!(!line.is_degenerate(1.0));
    }
}
