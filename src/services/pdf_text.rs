use pdfium_render::prelude::*;

pub const RENDER_WIDTH: i32 = 1000;
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;

/// Configuration for rendering a PDF page
pub struct PageRenderConfig {
    pub width: i32,
    pub height: i32,
    pub stride: usize,
}

pub fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

pub fn render_width_for_zoom(zoom: f64) -> i32 {
    (RENDER_WIDTH as f64 * clamp_zoom(zoom)).round() as i32
}

/// Rendered (width, height) of a page in pixels at `zoom`
pub fn page_size_for_zoom(page_width_pts: f64, page_height_pts: f64, zoom: f64) -> (i32, i32) {
    let render_width = render_width_for_zoom(zoom);
    let scale = render_width as f64 / page_width_pts;
    (render_width, (page_height_pts * scale) as i32)
}

pub fn calculate_page_dimensions(bitmap: &PdfBitmap) -> PageRenderConfig {
    let width = bitmap.width();
    let height = bitmap.height();
    PageRenderConfig {
        width,
        height,
        stride: (width * 4) as usize,
    }
}

pub fn create_render_config(zoom: f64) -> PdfRenderConfig {
    PdfRenderConfig::new()
        .set_target_width(render_width_for_zoom(zoom))
        .set_format(PdfBitmapFormat::BGRA)
}

/// Plain text of one page
pub fn page_text(page: &PdfPage) -> Option<String> {
    page.text().ok().map(|text_page| text_page.all())
}

/// Plain text of the whole document, pages separated by blank lines
pub fn document_text(document: &PdfDocument) -> String {
    document
        .pages()
        .iter()
        .filter_map(|page| page_text(&page))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_width_for_zoom() {
        assert_eq!(render_width_for_zoom(1.0), 1000);
        assert_eq!(render_width_for_zoom(1.25), 1250);
        assert_eq!(render_width_for_zoom(10.0), 3000);
        assert_eq!(render_width_for_zoom(0.1), 500);
    }

    #[test]
    fn test_page_size_for_zoom() {
        // US Letter
        assert_eq!(page_size_for_zoom(612.0, 792.0, 1.0), (1000, 1294));
        assert_eq!(page_size_for_zoom(612.0, 792.0, 2.0), (2000, 2588));
    }
}
