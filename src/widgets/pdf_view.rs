use glib::subclass::Signal;
use gtk::glib;
use gtk::prelude::*;
use gtk::subclass::prelude::*;
use gtk::{Box, GestureDrag, Orientation, Overlay, Picture};
use pdfium_render::prelude::*;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::highlight::{
    Animation, Debouncer, HighlightLocator, HighlightRequest, MatchConfig, Rect, TriggerState,
    ease_out_cubic,
};
use crate::services::page_layer::{LineFragment, PageTextLayer};
use crate::services::pdf_text::{self, calculate_page_dimensions, create_render_config};
use crate::widgets::HighlightOverlay;

const PAGE_SPACING: i32 = 10;
const SCROLL_STEPS: u32 = 12;
const SCROLL_FRAME: Duration = Duration::from_millis(16);
/// Drags shorter than this (in pixels) are clicks, not selections
const MIN_SELECTION_DRAG: f64 = 3.0;

mod imp {
    use super::*;

    pub struct PdfView {
        pub document: RefCell<Option<PdfDocument<'static>>>,
        pub pdfium: RefCell<Option<&'static Pdfium>>,
        pub(super) page_pictures: RefCell<Vec<Picture>>,
        pub(super) highlight_overlays: RefCell<Vec<HighlightOverlay>>,
        /// Tracks which pages have been rendered at current zoom level
        pub(super) rendered_pages: RefCell<HashSet<usize>>,
        /// Text layers of rendered pages; presence means "text layer ready"
        pub(super) text_layers: RefCell<HashMap<usize, PageTextLayer>>,
        pub current_page: Cell<u16>,
        pub pending_update: Cell<bool>,
        /// Current zoom level (1.0 = 100%)
        pub zoom_level: Cell<f64>,
        pub query: RefCell<String>,
        pub trigger: RefCell<TriggerState>,
        pub debouncer: Debouncer,
        pub debounce_delay: Cell<Duration>,
        pub locator: RefCell<HighlightLocator>,
        pub scroll_animation: Animation,
    }

    impl Default for PdfView {
        fn default() -> Self {
            Self {
                document: RefCell::new(None),
                pdfium: RefCell::new(None),
                page_pictures: RefCell::new(Vec::new()),
                highlight_overlays: RefCell::new(Vec::new()),
                rendered_pages: RefCell::new(HashSet::new()),
                text_layers: RefCell::new(HashMap::new()),
                current_page: Cell::new(0),
                pending_update: Cell::new(false),
                zoom_level: Cell::new(1.0),
                query: RefCell::new(String::new()),
                trigger: RefCell::new(TriggerState::default()),
                debouncer: Debouncer::new(),
                debounce_delay: Cell::new(Duration::from_millis(50)),
                locator: RefCell::new(HighlightLocator::default()),
                scroll_animation: Animation::new(),
            }
        }
    }

    #[glib::object_subclass]
    impl ObjectSubclass for PdfView {
        const NAME: &'static str = "GlintPdfView";
        type Type = super::PdfView;
        type ParentType = Box;
    }

    impl ObjectImpl for PdfView {
        fn constructed(&self) {
            self.parent_constructed();
            self.obj().setup_widgets();
        }

        fn signals() -> &'static [Signal] {
            static SIGNALS: OnceLock<Vec<Signal>> = OnceLock::new();
            SIGNALS.get_or_init(|| {
                vec![
                    // Emitted with the page index and text of a mouse selection
                    Signal::builder("text-selected")
                        .param_types([u32::static_type(), String::static_type()])
                        .build(),
                ]
            })
        }
    }

    impl WidgetImpl for PdfView {}
    impl BoxImpl for PdfView {}
}

glib::wrapper! {
    pub struct PdfView(ObjectSubclass<imp::PdfView>)
        @extends Box, gtk::Widget,
        @implements gtk::Accessible, gtk::Buildable, gtk::ConstraintTarget, gtk::Orientable;
}

impl PdfView {
    pub fn new() -> Self {
        glib::Object::builder().build()
    }

    fn setup_widgets(&self) {
        self.set_orientation(Orientation::Vertical);
        self.set_spacing(PAGE_SPACING);
        self.setup_scroll_tracking();
    }

    pub fn set_pdfium(&self, pdfium: &'static Pdfium) {
        self.imp().pdfium.replace(Some(pdfium));
    }

    /// Apply matching heuristics and the text-layer debounce
    pub fn configure(&self, matching: MatchConfig, debounce: Duration) {
        self.imp().locator.replace(HighlightLocator::new(matching));
        self.imp().debounce_delay.set(debounce);
    }

    pub fn load_pdf(&self, path: &Path) -> Result<()> {
        self.clear();

        let pdfium = self
            .imp()
            .pdfium
            .borrow()
            .ok_or_else(|| Error::Pdf("Pdfium not initialized".to_string()))?;

        let document = pdfium.load_pdf_from_file(path, None)?;
        info!(path = %path.display(), pages = document.pages().len(), "opened document");

        self.imp().document.replace(Some(document));
        self.imp().current_page.set(0);
        self.render_pages();
        self.request_highlight();

        Ok(())
    }

    fn clear(&self) {
        let imp = self.imp();
        imp.debouncer.cancel();
        imp.scroll_animation.stop();
        imp.trigger.borrow_mut().clear();
        while let Some(child) = self.first_child() {
            self.remove(&child);
        }
        imp.page_pictures.borrow_mut().clear();
        imp.highlight_overlays.borrow_mut().clear();
        imp.rendered_pages.borrow_mut().clear();
        imp.text_layers.borrow_mut().clear();
    }

    /// Calculate page dimensions at current zoom level without rendering
    fn calculate_page_size(&self, page: &PdfPage) -> (i32, i32) {
        pdf_text::page_size_for_zoom(
            page.width().value as f64,
            page.height().value as f64,
            self.imp().zoom_level.get(),
        )
    }

    /// Create a placeholder Picture with the correct size (no pixel allocation)
    fn create_placeholder(&self, width: i32, height: i32) -> Picture {
        let picture = Picture::builder()
            .can_shrink(false)
            .width_request(width)
            .height_request(height)
            .build();
        picture.add_css_class("pdf-placeholder");
        picture
    }

    /// Set up page structure with placeholders (fast - no rendering)
    fn render_pages(&self) {
        let doc_borrow = self.imp().document.borrow();
        let doc = match doc_borrow.as_ref() {
            Some(d) => d,
            None => return,
        };

        let mut page_pictures = Vec::new();
        let mut highlight_overlays = Vec::new();

        for (page_index, page) in doc.pages().iter().enumerate() {
            let (width, height) = self.calculate_page_size(&page);

            let picture = self.create_placeholder(width, height);
            self.setup_page_selection(&picture, page_index);

            let highlight = HighlightOverlay::new();
            highlight.set_content_width(width);
            highlight.set_content_height(height);

            let overlay = Overlay::new();
            overlay.set_halign(gtk::Align::Center);
            overlay.set_child(Some(&picture));
            overlay.add_overlay(&highlight);
            self.append(&overlay);

            page_pictures.push(picture);
            highlight_overlays.push(highlight);
        }

        self.imp().page_pictures.replace(page_pictures);
        self.imp().highlight_overlays.replace(highlight_overlays);
        self.imp().rendered_pages.borrow_mut().clear();
        self.imp().text_layers.borrow_mut().clear();

        drop(doc_borrow);

        // Let GTK allocate the placeholders before measuring visibility
        let view_weak = self.downgrade();
        glib::idle_add_local_once(move || {
            if let Some(view) = view_weak.upgrade() {
                view.render_visible_pages();
            }
        });
    }

    /// Render only the pages that are currently visible (plus a small buffer)
    pub fn render_visible_pages(&self) {
        let visible_range = match self.get_visible_page_range() {
            Some(range) => range,
            None => return,
        };

        let mut ready_pages = Vec::new();
        {
            let doc_borrow = self.imp().document.borrow();
            let doc = match doc_borrow.as_ref() {
                Some(d) => d,
                None => return,
            };

            for page_index in visible_range {
                if self.imp().rendered_pages.borrow().contains(&page_index) {
                    continue;
                }
                if let Ok(page) = doc.pages().get(page_index as u16) {
                    if self.render_page_content(&page, page_index) {
                        self.imp().rendered_pages.borrow_mut().insert(page_index);
                        ready_pages.push(page_index);
                    }
                }
            }
        }

        // Signal after the document borrow is released
        for page_index in ready_pages {
            self.text_layer_ready(page_index);
        }
    }

    /// Get the range of pages currently visible (with buffer)
    fn get_visible_page_range(&self) -> Option<std::ops::RangeInclusive<usize>> {
        let page_pictures = self.imp().page_pictures.borrow();
        if page_pictures.is_empty() {
            return None;
        }

        let (scroll_y, viewport_height) = match self.find_scrolled_window() {
            Some(scrolled) => {
                let adjustment = scrolled.vadjustment();
                (adjustment.value(), adjustment.page_size())
            }
            None => (0.0, 0.0),
        };

        let mut first_visible: Option<usize> = None;
        let mut last_visible: Option<usize> = None;

        for index in 0..page_pictures.len() {
            let (page_top, page_bottom) = self.page_span(&page_pictures, index);
            if page_bottom > scroll_y && page_top < scroll_y + viewport_height {
                if first_visible.is_none() {
                    first_visible = Some(index);
                }
                last_visible = Some(index);
            }
        }

        let first = first_visible.unwrap_or(0);
        let last = last_visible.unwrap_or(0);

        // Add buffer of 1 page on each side
        let buffer = 1;
        let start = first.saturating_sub(buffer);
        let end = (last + buffer).min(page_pictures.len() - 1);

        Some(start..=end)
    }

    /// Vertical extent of a page in view coordinates
    fn page_span(&self, page_pictures: &[Picture], index: usize) -> (f64, f64) {
        let page_top: f64 = page_pictures
            .iter()
            .take(index)
            .map(|p| p.height_request() as f64 + PAGE_SPACING as f64)
            .sum();
        let height = page_pictures
            .get(index)
            .map(|p| p.height_request() as f64)
            .unwrap_or_default();
        (page_top, page_top + height)
    }

    /// Top-left corner of a page in view coordinates
    fn page_origin(&self, picture: &Picture, page_index: usize) -> (f64, f64) {
        if let Some(point) = picture.compute_point(self, &gtk::graphene::Point::zero()) {
            return (point.x() as f64, point.y() as f64);
        }
        let page_pictures = self.imp().page_pictures.borrow();
        let left = ((self.width() - picture.width_request()).max(0) / 2) as f64;
        (left, self.page_span(&page_pictures, page_index).0)
    }

    /// Render a page's pixels and build its text layer
    fn render_page_content(&self, page: &PdfPage, page_index: usize) -> bool {
        let picture = match self.imp().page_pictures.borrow().get(page_index) {
            Some(p) => p.clone(),
            None => return false,
        };
        let highlight = match self.highlight_overlay(page_index) {
            Some(h) => h,
            None => return false,
        };

        let zoom = self.imp().zoom_level.get();
        let config = create_render_config(zoom);
        let bitmap = match page.render_with_config(&config) {
            Ok(b) => b,
            Err(e) => {
                debug!(page_index, "render failed: {}", e);
                return false;
            }
        };

        let dimensions = calculate_page_dimensions(&bitmap);
        let texture = self.create_texture_from_bitmap(&bitmap, &dimensions);

        picture.set_paintable(Some(&texture));
        picture.remove_css_class("pdf-placeholder");
        highlight.set_content_width(dimensions.width);
        highlight.set_content_height(dimensions.height);

        let origin = self.page_origin(&picture, page_index);
        if let Some(layer) =
            PageTextLayer::build_from_page(page, page_index, origin, dimensions.width as f64)
        {
            self.imp().text_layers.borrow_mut().insert(page_index, layer);
        }

        debug!(page_index, "rendered page");
        true
    }

    fn create_texture_from_bitmap(
        &self,
        bitmap: &PdfBitmap,
        config: &pdf_text::PageRenderConfig,
    ) -> gtk::gdk::MemoryTexture {
        let bytes = bitmap.as_raw_bytes();
        let bytes_glib = glib::Bytes::from(&bytes);

        gtk::gdk::MemoryTexture::new(
            config.width,
            config.height,
            gtk::gdk::MemoryFormat::B8g8r8a8,
            &bytes_glib,
            config.stride,
        )
    }

    /// A fresh text layer may satisfy a highlight that found none
    fn text_layer_ready(&self, page_index: usize) {
        let wants_page = self
            .imp()
            .trigger
            .borrow()
            .current()
            .is_some_and(|r| r.page_index == page_index);
        if wants_page {
            self.schedule_highlight();
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    fn setup_page_selection(&self, picture: &Picture, page_index: usize) {
        let gesture = GestureDrag::new();
        let view_weak = self.downgrade();
        let picture_weak = picture.downgrade();

        gesture.connect_drag_end(move |gesture, offset_x, offset_y| {
            if offset_x.abs() < MIN_SELECTION_DRAG && offset_y.abs() < MIN_SELECTION_DRAG {
                return;
            }
            let (Some(view), Some(picture)) = (view_weak.upgrade(), picture_weak.upgrade())
            else {
                return;
            };
            if let Some((x, y)) = gesture.start_point() {
                view.handle_page_selection(&picture, page_index, x, y, offset_x, offset_y);
            }
        });

        picture.add_controller(gesture);
    }

    /// Turn a drag on a page picture into the highlight query
    fn handle_page_selection(
        &self,
        picture: &Picture,
        page_index: usize,
        x: f64,
        y: f64,
        offset_x: f64,
        offset_y: f64,
    ) {
        let (origin_left, origin_top) = self.page_origin(picture, page_index);
        let selection = Rect::from_points(
            origin_left + x,
            origin_top + y,
            origin_left + x + offset_x,
            origin_top + y + offset_y,
        );

        let text = match self.imp().text_layers.borrow().get(&page_index) {
            Some(layer) => layer.text_in_rect(&selection),
            None => {
                debug!(page_index, "selection before text layer was built");
                return;
            }
        };
        let Some(text) = text else {
            return;
        };

        debug!(page_index, chars = text.chars().count(), "text selected");
        self.emit_by_name::<()>("text-selected", &[&(page_index as u32), &text]);
        // The page is already on screen, so no jump to its top
        self.imp().current_page.set(page_index as u16);
        self.set_query(&text);
    }

    // ------------------------------------------------------------------
    // Highlighting
    // ------------------------------------------------------------------

    /// Set the text to highlight on the current page
    pub fn set_query(&self, query: &str) {
        self.imp().query.replace(query.to_string());
        self.request_highlight();
    }

    /// Bring `page_index` into view and highlight `query` there
    pub fn highlight_on_page(&self, page_index: usize, query: &str) {
        let imp = self.imp();
        if page_index >= imp.page_pictures.borrow().len() {
            debug!(page_index, "highlight requested for a page outside the document");
            return;
        }

        if page_index != imp.current_page.get() as usize {
            imp.scroll_animation.stop();
            if let Some(scrolled) = self.find_scrolled_window() {
                let (page_top, _) = self.page_span(&imp.page_pictures.borrow(), page_index);
                scrolled.vadjustment().set_value(page_top);
            }
            imp.current_page.set(page_index as u16);
            self.render_visible_pages();
        }

        self.set_query(query);
    }

    /// First page whose text contains `passage`
    pub fn find_page_for(&self, passage: &str) -> Option<usize> {
        let doc_borrow = self.imp().document.borrow();
        let doc = doc_borrow.as_ref()?;
        let texts: Vec<String> = doc
            .pages()
            .iter()
            .map(|page| pdf_text::page_text(&page).unwrap_or_default())
            .collect();
        self.imp()
            .locator
            .borrow()
            .find_page(texts.iter().map(String::as_str), passage)
    }

    /// Re-run the highlight pass if page, zoom or query changed
    fn request_highlight(&self) {
        let imp = self.imp();
        let request = HighlightRequest::new(
            imp.current_page.get() as usize,
            imp.zoom_level.get(),
            imp.query.borrow().clone(),
        );

        if !imp.trigger.borrow_mut().update(request) {
            return;
        }

        // Results from the previous page/scale/query are stale immediately
        self.clear_all_highlights();
        self.schedule_highlight();
    }

    fn schedule_highlight(&self) {
        let view_weak = self.downgrade();
        self.imp()
            .debouncer
            .schedule(self.imp().debounce_delay.get(), move || {
                if let Some(view) = view_weak.upgrade() {
                    view.run_highlight();
                }
            });
    }

    fn run_highlight(&self) {
        let request = match self.imp().trigger.borrow().current() {
            Some(r) => r.clone(),
            None => return,
        };
        if request.query.trim().is_empty() {
            return;
        }

        let mut first_fragment: Option<Rect> = None;
        let rects = {
            let layers = self.imp().text_layers.borrow();
            let layer = match layers.get(&request.page_index) {
                Some(layer) => layer,
                None => {
                    debug!(page = request.page_index, "text layer not ready yet");
                    return;
                }
            };
            self.imp().locator.borrow().locate_with(
                layer,
                &request.query,
                |fragment: &LineFragment| first_fragment = fragment.bounds(),
            )
        };

        debug!(page = request.page_index, count = rects.len(), "highlight computed");
        if let Some(overlay) = self.highlight_overlay(request.page_index) {
            overlay.set_highlights(rects);
        }
        if let Some(bounds) = first_fragment {
            self.scroll_into_view(&bounds);
        }
    }

    /// Smoothly scroll so `bounds` (view coordinates) sits in the middle;
    /// a newer scroll replaces one still in flight
    fn scroll_into_view(&self, bounds: &Rect) {
        let scrolled = match self.find_scrolled_window() {
            Some(s) => s,
            None => return,
        };
        let adjustment = scrolled.vadjustment();
        let max_value = (adjustment.upper() - adjustment.page_size()).max(0.0);
        let target = (bounds.center_y() - adjustment.page_size() / 2.0).clamp(0.0, max_value);
        let start = adjustment.value();

        self.imp()
            .scroll_animation
            .start(SCROLL_FRAME, SCROLL_STEPS, move |t| {
                adjustment.set_value(start + (target - start) * ease_out_cubic(t));
            });
    }

    /// Clear all highlight overlays
    fn clear_all_highlights(&self) {
        for overlay in self.imp().highlight_overlays.borrow().iter() {
            overlay.clear();
        }
    }

    fn highlight_overlay(&self, page_index: usize) -> Option<HighlightOverlay> {
        self.imp()
            .highlight_overlays
            .borrow()
            .get(page_index)
            .cloned()
    }

    // ------------------------------------------------------------------
    // Scrolling and page tracking
    // ------------------------------------------------------------------

    fn setup_scroll_tracking(&self) {
        let view_weak = self.downgrade();

        let scroll_controller =
            gtk::EventControllerScroll::new(gtk::EventControllerScrollFlags::VERTICAL);

        scroll_controller.connect_scroll(move |_, _, _| {
            if let Some(view) = view_weak.upgrade() {
                view.schedule_page_update();
            }
            glib::Propagation::Proceed
        });

        self.add_controller(scroll_controller);
    }

    pub(crate) fn schedule_page_update(&self) {
        let imp = self.imp();

        if imp.pending_update.get() {
            return;
        }

        imp.pending_update.set(true);

        let view_weak = self.downgrade();
        glib::timeout_add_local_once(Duration::from_millis(100), move || {
            if let Some(view) = view_weak.upgrade() {
                view.imp().pending_update.set(false);
                view.render_visible_pages();
                view.update_current_page();
            }
        });
    }

    fn update_current_page(&self) {
        let page_index = match self.calculate_current_page_from_scroll() {
            Some(p) => p,
            None => return,
        };
        if page_index != self.imp().current_page.get() {
            self.imp().current_page.set(page_index);
            self.request_highlight();
        }
    }

    fn find_scrolled_window(&self) -> Option<gtk::ScrolledWindow> {
        self.parent()?.parent()?.downcast().ok()
    }

    /// The page under the middle of the viewport
    fn calculate_current_page_from_scroll(&self) -> Option<u16> {
        let scrolled = self.find_scrolled_window()?;
        let adjustment = scrolled.vadjustment();
        let middle_y = adjustment.value() + adjustment.page_size() / 2.0;

        let page_pictures = self.imp().page_pictures.borrow();
        for index in 0..page_pictures.len() {
            let (_, page_bottom) = self.page_span(&page_pictures, index);
            if middle_y < page_bottom + PAGE_SPACING as f64 {
                return Some(index as u16);
            }
        }

        if !page_pictures.is_empty() {
            return Some((page_pictures.len() - 1) as u16);
        }
        None
    }

    pub fn has_document(&self) -> bool {
        self.imp().document.borrow().is_some()
    }

    pub fn current_page(&self) -> u16 {
        self.imp().current_page.get()
    }

    /// Text of a page, from its text layer when rendered
    pub fn page_text(&self, page_index: usize) -> Option<String> {
        if let Some(layer) = self.imp().text_layers.borrow().get(&page_index) {
            return Some(layer.page_text());
        }
        let doc_borrow = self.imp().document.borrow();
        let page = doc_borrow.as_ref()?.pages().get(page_index as u16).ok()?;
        pdf_text::page_text(&page)
    }

    pub fn document_text(&self) -> Option<String> {
        self.imp()
            .document
            .borrow()
            .as_ref()
            .map(pdf_text::document_text)
    }

    // ------------------------------------------------------------------
    // Zoom
    // ------------------------------------------------------------------

    pub fn zoom_level(&self) -> f64 {
        self.imp().zoom_level.get()
    }

    /// Set the zoom level and update page sizes
    pub fn set_zoom_level(&self, zoom: f64) {
        let clamped_zoom = pdf_text::clamp_zoom(zoom);
        if clamped_zoom == self.imp().zoom_level.get() {
            return;
        }
        self.imp().zoom_level.set(clamped_zoom);
        self.update_page_sizes_for_zoom();
        self.request_highlight();
    }

    /// Update all page sizes for the new zoom level (fast - no rendering)
    /// Then render only visible pages
    fn update_page_sizes_for_zoom(&self) {
        {
            let doc_borrow = self.imp().document.borrow();
            let doc = match doc_borrow.as_ref() {
                Some(d) => d,
                None => return,
            };

            let page_pictures = self.imp().page_pictures.borrow();
            let highlight_overlays = self.imp().highlight_overlays.borrow();

            for (index, page) in doc.pages().iter().enumerate() {
                let (width, height) = self.calculate_page_size(&page);

                if let Some(picture) = page_pictures.get(index) {
                    picture.set_width_request(width);
                    picture.set_height_request(height);
                    picture.set_paintable(gtk::gdk::Paintable::NONE);
                    picture.add_css_class("pdf-placeholder");
                }

                if let Some(highlight) = highlight_overlays.get(index) {
                    highlight.set_content_width(width);
                    highlight.set_content_height(height);
                }
            }
        }

        // Geometry changed: every page needs new pixels and a new text layer
        self.imp().rendered_pages.borrow_mut().clear();
        self.imp().text_layers.borrow_mut().clear();

        let view_weak = self.downgrade();
        glib::idle_add_local_once(move || {
            if let Some(view) = view_weak.upgrade() {
                view.render_visible_pages();
            }
        });
    }
}

impl Default for PdfView {
    fn default() -> Self {
        Self::new()
    }
}
