use gtk::glib;
use gtk::prelude::*;
use gtk::subclass::prelude::*;
use std::cell::RefCell;

use crate::highlight::HighlightRect;

mod imp {
    use super::*;

    #[derive(Default)]
    pub struct HighlightOverlay {
        pub highlights: RefCell<Vec<HighlightRect>>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for HighlightOverlay {
        const NAME: &'static str = "GlintHighlightOverlay";
        type Type = super::HighlightOverlay;
        type ParentType = gtk::DrawingArea;
    }

    impl ObjectImpl for HighlightOverlay {
        fn constructed(&self) {
            self.parent_constructed();
            self.obj().setup_drawing();
        }
    }

    impl WidgetImpl for HighlightOverlay {}
    impl DrawingAreaImpl for HighlightOverlay {}
}

glib::wrapper! {
    /// Transparent layer over a rendered page that paints matched text
    pub struct HighlightOverlay(ObjectSubclass<imp::HighlightOverlay>)
        @extends gtk::DrawingArea, gtk::Widget,
        @implements gtk::Accessible, gtk::Buildable, gtk::ConstraintTarget;
}

impl HighlightOverlay {
    pub fn new() -> Self {
        glib::Object::builder().build()
    }

    fn setup_drawing(&self) {
        // Make the overlay transparent to clicks
        self.set_can_target(false);

        let overlay_weak = self.downgrade();
        self.set_draw_func(move |_area, cr, _width, _height| {
            if let Some(overlay) = overlay_weak.upgrade() {
                overlay.draw(cr);
            }
        });
    }

    fn draw(&self, cr: &gtk::cairo::Context) {
        for rect in self.imp().highlights.borrow().iter() {
            // Amber with ~35% opacity
            cr.set_source_rgba(1.0, 0.76, 0.03, 0.35);
            cr.rectangle(rect.left, rect.top, rect.width, rect.height);
            let _ = cr.fill();

            cr.set_source_rgba(0.9, 0.6, 0.0, 0.6);
            cr.set_line_width(1.0);
            cr.rectangle(rect.left, rect.top, rect.width, rect.height);
            let _ = cr.stroke();
        }
    }

    /// Replace the painted rectangles (page-relative pixels)
    pub fn set_highlights(&self, rects: Vec<HighlightRect>) {
        self.imp().highlights.replace(rects);
        self.queue_draw();
    }

    pub fn clear(&self) {
        self.imp().highlights.borrow_mut().clear();
        self.queue_draw();
    }
}

impl Default for HighlightOverlay {
    fn default() -> Self {
        Self::new()
    }
}
