use gtk::glib;
use gtk::prelude::*;
use gtk::subclass::prelude::*;
use gtk::{Button, HeaderBar, SearchEntry, ToggleButton};

mod imp {
    use super::*;

    #[derive(Default)]
    pub struct AppHeaderBar {
        pub header_bar: HeaderBar,
        pub open_button: Button,
        pub query_entry: SearchEntry,
        pub zoom_out_button: Button,
        pub zoom_in_button: Button,
        pub summarize_button: Button,
        pub translate_button: Button,
        pub panel_toggle: ToggleButton,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for AppHeaderBar {
        const NAME: &'static str = "GlintHeaderBar";
        type Type = super::AppHeaderBar;
        type ParentType = glib::Object;
    }

    impl ObjectImpl for AppHeaderBar {
        fn constructed(&self) {
            self.parent_constructed();
            self.obj().setup_widgets();
        }
    }
}

glib::wrapper! {
    pub struct AppHeaderBar(ObjectSubclass<imp::AppHeaderBar>);
}

impl AppHeaderBar {
    pub fn new() -> Self {
        glib::Object::builder().build()
    }

    fn setup_widgets(&self) {
        let imp = self.imp();

        imp.header_bar.set_show_title_buttons(true);

        imp.open_button.set_label("Open PDF");
        imp.header_bar.pack_start(&imp.open_button);

        imp.zoom_out_button.set_icon_name("zoom-out-symbolic");
        imp.zoom_out_button.set_tooltip_text(Some("Zoom out"));
        imp.header_bar.pack_start(&imp.zoom_out_button);

        imp.zoom_in_button.set_icon_name("zoom-in-symbolic");
        imp.zoom_in_button.set_tooltip_text(Some("Zoom in"));
        imp.header_bar.pack_start(&imp.zoom_in_button);

        imp.query_entry
            .set_placeholder_text(Some("Highlight text on this page"));
        imp.query_entry.set_width_chars(40);
        imp.header_bar.set_title_widget(Some(&imp.query_entry));

        imp.panel_toggle.set_icon_name("sidebar-show-right-symbolic");
        imp.panel_toggle.set_tooltip_text(Some("AI panel"));
        imp.header_bar.pack_end(&imp.panel_toggle);

        imp.translate_button.set_label("Translate page");
        imp.header_bar.pack_end(&imp.translate_button);

        imp.summarize_button.set_label("Summarize");
        imp.header_bar.pack_end(&imp.summarize_button);
    }

    /// Returns the HeaderBar widget to be used with set_titlebar()
    pub fn widget(&self) -> &HeaderBar {
        &self.imp().header_bar
    }

    pub fn open_button(&self) -> &Button {
        &self.imp().open_button
    }

    pub fn query_entry(&self) -> &SearchEntry {
        &self.imp().query_entry
    }

    pub fn zoom_out_button(&self) -> &Button {
        &self.imp().zoom_out_button
    }

    pub fn zoom_in_button(&self) -> &Button {
        &self.imp().zoom_in_button
    }

    pub fn summarize_button(&self) -> &Button {
        &self.imp().summarize_button
    }

    pub fn translate_button(&self) -> &Button {
        &self.imp().translate_button
    }

    pub fn panel_toggle(&self) -> &ToggleButton {
        &self.imp().panel_toggle
    }
}

impl Default for AppHeaderBar {
    fn default() -> Self {
        Self::new()
    }
}
