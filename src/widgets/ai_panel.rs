use glib::subclass::Signal;
use gtk::glib;
use gtk::prelude::*;
use gtk::subclass::prelude::*;
use gtk::{Box, Button, Entry, Label, Orientation, PolicyType, ScrolledWindow, Spinner};
use std::sync::OnceLock;

use crate::services::ai::AiContent;
use crate::services::store::Note;
use crate::services::summary::Summary;
use crate::services::translation::PageTranslation;

const PANEL_HEIGHT: i32 = 220;

mod imp {
    use super::*;

    pub struct AiPanel {
        pub title: Label,
        pub spinner: Spinner,
        pub close_button: Button,
        pub content: Box,
        pub entry: Entry,
        pub ask_button: Button,
        pub explain_button: Button,
        pub cite_button: Button,
        pub note_button: Button,
        pub notes_button: Button,
        pub export_button: Button,
    }

    impl Default for AiPanel {
        fn default() -> Self {
            Self {
                title: Label::new(None),
                spinner: Spinner::new(),
                close_button: Button::new(),
                content: Box::new(Orientation::Vertical, 8),
                entry: Entry::new(),
                ask_button: Button::with_label("Ask"),
                explain_button: Button::with_label("Explain"),
                cite_button: Button::with_label("Cite"),
                note_button: Button::with_label("Note"),
                notes_button: Button::with_label("Notes"),
                export_button: Button::with_label("Export"),
            }
        }
    }

    #[glib::object_subclass]
    impl ObjectSubclass for AiPanel {
        const NAME: &'static str = "GlintAiPanel";
        type Type = super::AiPanel;
        type ParentType = Box;
    }

    impl ObjectImpl for AiPanel {
        fn constructed(&self) {
            self.parent_constructed();
            self.obj().setup_widgets();
        }

        fn signals() -> &'static [Signal] {
            static SIGNALS: OnceLock<Vec<Signal>> = OnceLock::new();
            SIGNALS.get_or_init(|| {
                vec![
                    // Emitted with the translated page and the block's source paragraph
                    Signal::builder("block-activated")
                        .param_types([u32::static_type(), String::static_type()])
                        .build(),
                    // Emitted with a summary passage to find in the document
                    Signal::builder("passage-activated")
                        .param_types([String::static_type()])
                        .build(),
                    Signal::builder("note-activated")
                        .param_types([u32::static_type(), String::static_type()])
                        .build(),
                    Signal::builder("note-edit-requested")
                        .param_types([i64::static_type()])
                        .build(),
                    Signal::builder("note-delete-requested")
                        .param_types([i64::static_type()])
                        .build(),
                ]
            })
        }
    }

    impl WidgetImpl for AiPanel {}
    impl BoxImpl for AiPanel {}
}

glib::wrapper! {
    /// Bottom panel showing AI output for the open document
    pub struct AiPanel(ObjectSubclass<imp::AiPanel>)
        @extends Box, gtk::Widget,
        @implements gtk::Accessible, gtk::Buildable, gtk::ConstraintTarget, gtk::Orientable;
}

impl AiPanel {
    pub fn new() -> Self {
        glib::Object::builder().build()
    }

    fn setup_widgets(&self) {
        let imp = self.imp();

        self.set_orientation(Orientation::Vertical);
        self.set_spacing(8);
        self.set_size_request(-1, PANEL_HEIGHT);

        let header = Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(8)
            .margin_start(12)
            .margin_end(12)
            .margin_top(8)
            .build();

        imp.title.set_xalign(0.0);
        imp.title.set_hexpand(true);
        imp.title.add_css_class("heading");
        header.append(&imp.title);

        imp.spinner.set_visible(false);
        header.append(&imp.spinner);

        imp.close_button.set_icon_name("window-close-symbolic");
        imp.close_button.add_css_class("flat");
        header.append(&imp.close_button);
        self.append(&header);

        imp.content.set_margin_start(12);
        imp.content.set_margin_end(12);
        let scrolled = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Never)
            .vscrollbar_policy(PolicyType::Automatic)
            .vexpand(true)
            .child(&imp.content)
            .build();
        self.append(&scrolled);

        let input_box = Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(4)
            .margin_start(12)
            .margin_end(12)
            .margin_bottom(12)
            .build();
        imp.entry.set_hexpand(true);
        imp.entry
            .set_placeholder_text(Some("Question, equation, citation or note"));
        input_box.append(&imp.entry);
        input_box.append(&imp.ask_button);
        input_box.append(&imp.explain_button);
        input_box.append(&imp.cite_button);
        input_box.append(&gtk::Separator::new(Orientation::Vertical));
        imp.note_button
            .set_tooltip_text(Some("Save the selected text with the entry as a note"));
        input_box.append(&imp.note_button);
        input_box.append(&imp.notes_button);
        imp.export_button
            .set_tooltip_text(Some("Copy the notes as markdown"));
        input_box.append(&imp.export_button);
        self.append(&input_box);

        self.add_css_class("ai-panel");
    }

    pub fn close_button(&self) -> &Button {
        &self.imp().close_button
    }

    pub fn entry(&self) -> &Entry {
        &self.imp().entry
    }

    pub fn ask_button(&self) -> &Button {
        &self.imp().ask_button
    }

    pub fn explain_button(&self) -> &Button {
        &self.imp().explain_button
    }

    pub fn cite_button(&self) -> &Button {
        &self.imp().cite_button
    }

    pub fn note_button(&self) -> &Button {
        &self.imp().note_button
    }

    pub fn notes_button(&self) -> &Button {
        &self.imp().notes_button
    }

    pub fn export_button(&self) -> &Button {
        &self.imp().export_button
    }

    /// Text typed into the entry, trimmed; the entry is cleared
    pub fn take_input(&self) -> Option<String> {
        let text = self.imp().entry.text().trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.imp().entry.set_text("");
        Some(text)
    }

    pub fn set_loading(&self, title: &str) {
        let imp = self.imp();
        imp.title.set_text(title);
        imp.spinner.set_visible(true);
        imp.spinner.start();
        self.clear_content();
        self.append_text("Working...");
    }

    fn stop_loading(&self) {
        let imp = self.imp();
        imp.spinner.stop();
        imp.spinner.set_visible(false);
    }

    pub fn show_content(&self, content: &AiContent) {
        self.stop_loading();
        self.imp().title.set_text(content.kind.title());
        self.clear_content();
        if content.is_error {
            self.append_error(&content.text);
        } else {
            self.append_text(&content.text);
        }
    }

    /// Show a page translation, one clickable block per paragraph
    pub fn show_translation(&self, translation: &PageTranslation) {
        if translation.content.is_error || translation.blocks.is_empty() {
            self.show_content(&translation.content);
            return;
        }

        self.stop_loading();
        self.imp()
            .title
            .set_text(&format!("Translation (page {})", translation.page_index + 1));
        self.clear_content();

        for (index, block) in translation.blocks.iter().enumerate() {
            let button = self.wrapped_button(&block.target);
            match translation.highlight_target(index) {
                Some((page_index, source)) => {
                    button.set_tooltip_text(Some(source));
                    let panel_weak = self.downgrade();
                    let source = source.to_string();
                    button.connect_clicked(move |_| {
                        if let Some(panel) = panel_weak.upgrade() {
                            panel.emit_by_name::<()>(
                                "block-activated",
                                &[&(page_index as u32), &source],
                            );
                        }
                    });
                }
                None => button.set_sensitive(false),
            }
            self.imp().content.append(&button);
        }
    }

    /// Show a summary followed by its key passages as clickable quotes
    pub fn show_summary(&self, content: &AiContent, summary: &Summary) {
        self.stop_loading();
        self.imp().title.set_text(content.kind.title());
        self.clear_content();
        self.append_text(&summary.overview);

        if summary.passages.is_empty() {
            return;
        }
        let heading = Label::builder().label("Key passages").xalign(0.0).build();
        heading.add_css_class("heading");
        self.imp().content.append(&heading);

        for passage in &summary.passages {
            let button = self.wrapped_button(&format!("\u{201c}{}\u{201d}", passage));
            let panel_weak = self.downgrade();
            let passage = passage.clone();
            button.connect_clicked(move |_| {
                if let Some(panel) = panel_weak.upgrade() {
                    panel.emit_by_name::<()>("passage-activated", &[&passage]);
                }
            });
            self.imp().content.append(&button);
        }
    }

    /// List the document's notes with jump, edit and delete actions
    pub fn show_notes(&self, notes: &[Note]) {
        self.stop_loading();
        self.imp().title.set_text("Notes");
        self.clear_content();

        if notes.is_empty() {
            self.append_text("No notes yet. Select text on a page, type a note and press Note.");
            return;
        }

        for note in notes {
            let row = Box::new(Orientation::Horizontal, 4);

            let quote = self.wrapped_button(&format!("p. {}: {}", note.page_index + 1, note.quote));
            quote.set_hexpand(true);
            if !note.note.is_empty() {
                quote.set_tooltip_text(Some(&note.note));
            }
            let panel_weak = self.downgrade();
            let (page_index, text) = (note.page_index as u32, note.quote.clone());
            quote.connect_clicked(move |_| {
                if let Some(panel) = panel_weak.upgrade() {
                    panel.emit_by_name::<()>("note-activated", &[&page_index, &text]);
                }
            });
            row.append(&quote);

            let edit = Button::from_icon_name("document-edit-symbolic");
            edit.add_css_class("flat");
            edit.set_tooltip_text(Some("Replace the note with the entry text"));
            let panel_weak = self.downgrade();
            let id = note.id;
            edit.connect_clicked(move |_| {
                if let Some(panel) = panel_weak.upgrade() {
                    panel.emit_by_name::<()>("note-edit-requested", &[&id]);
                }
            });
            row.append(&edit);

            let delete = Button::from_icon_name("user-trash-symbolic");
            delete.add_css_class("flat");
            let panel_weak = self.downgrade();
            delete.connect_clicked(move |_| {
                if let Some(panel) = panel_weak.upgrade() {
                    panel.emit_by_name::<()>("note-delete-requested", &[&id]);
                }
            });
            row.append(&delete);

            self.imp().content.append(&row);
        }
    }

    /// Status line under the current content
    pub fn show_message(&self, message: &str) {
        self.append_text(message);
    }

    fn wrapped_button(&self, text: &str) -> Button {
        let label = Label::builder().label(text).wrap(true).xalign(0.0).build();
        let button = Button::builder().child(&label).build();
        button.add_css_class("flat");
        button
    }

    fn append_text(&self, text: &str) {
        let label = Label::builder()
            .label(text)
            .wrap(true)
            .xalign(0.0)
            .yalign(0.0)
            .selectable(true)
            .build();
        self.imp().content.append(&label);
    }

    fn append_error(&self, error: &str) {
        let label = Label::builder().wrap(true).xalign(0.0).build();
        label.set_markup(&format!(
            "<span color='red'>{}</span>",
            glib::markup_escape_text(error)
        ));
        self.imp().content.append(&label);
    }

    fn clear_content(&self) {
        let content = &self.imp().content;
        while let Some(child) = content.first_child() {
            content.remove(&child);
        }
    }

    pub fn clear(&self) {
        self.stop_loading();
        self.imp().title.set_text("");
        self.clear_content();
    }
}

impl Default for AiPanel {
    fn default() -> Self {
        Self::new()
    }
}
