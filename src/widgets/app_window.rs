use gtk::gio;
use gtk::glib;
use gtk::prelude::*;
use gtk::subclass::prelude::*;
use gtk::{ApplicationWindow, Box, Orientation, PolicyType, ScrolledWindow};
use pdfium_render::prelude::*;
use std::cell::RefCell;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::Result as StoreResult;
use crate::services::ai::{AiClient, AiContent, AiKind, AiTask};
use crate::services::session::{Session, SessionTicket};
use crate::services::store::{DocumentFingerprint, NoteId, Store};
use crate::services::summary::Summary;
use crate::services::translation::{self, PageTranslation};
use crate::widgets::{AiPanel, AppHeaderBar, PdfView};

const ZOOM_STEP: f64 = 0.25;
const AI_POLL_INTERVAL: Duration = Duration::from_millis(100);

mod imp {
    use super::*;

    #[derive(Default)]
    pub struct AppWindow {
        pub header_bar: AppHeaderBar,
        pub pdf_view: PdfView,
        pub ai_panel: AiPanel,
        pub settings: RefCell<Settings>,
        pub client: RefCell<Option<AiClient>>,
        pub store: RefCell<Option<Store>>,
        pub session: RefCell<Session>,
        /// Page and text of the last mouse selection, quoted by new notes
        pub last_selection: RefCell<Option<(usize, String)>>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for AppWindow {
        const NAME: &'static str = "GlintWindow";
        type Type = super::AppWindow;
        type ParentType = ApplicationWindow;
    }

    impl ObjectImpl for AppWindow {
        fn constructed(&self) {
            self.parent_constructed();
            self.obj().setup_widgets();
        }
    }

    impl WidgetImpl for AppWindow {}
    impl WindowImpl for AppWindow {}
    impl ApplicationWindowImpl for AppWindow {}
}

glib::wrapper! {
    pub struct AppWindow(ObjectSubclass<imp::AppWindow>)
        @extends ApplicationWindow, gtk::Window, gtk::Widget,
        @implements gio::ActionGroup, gio::ActionMap, gtk::Accessible, gtk::Buildable,
                    gtk::ConstraintTarget, gtk::Native, gtk::Root, gtk::ShortcutManager;
}

impl AppWindow {
    pub fn new(app: &gtk::Application, settings: Settings) -> Self {
        let window: Self = glib::Object::builder()
            .property("application", app)
            .property("title", "Glint")
            .property("default-width", 1100)
            .property("default-height", 800)
            .build();

        window.apply_settings(settings);
        window.init_pdfium();
        window.open_store();
        window
    }

    fn apply_settings(&self, settings: Settings) {
        let imp = self.imp();
        imp.pdf_view
            .configure(settings.matching, settings.debounce());
        imp.client.replace(Some(AiClient::from_settings(&settings)));
        if settings.api_key.is_none() {
            warn!("no API key configured; AI features will report errors");
        }
        imp.settings.replace(settings);
    }

    fn init_pdfium(&self) {
        let bindings = Pdfium::bind_to_library(Path::new("./libpdfium.so"))
            .or_else(|_| Pdfium::bind_to_system_library());

        match bindings {
            Ok(bindings) => {
                let pdfium: &'static Pdfium =
                    std::boxed::Box::leak(std::boxed::Box::new(Pdfium::new(bindings)));
                self.imp().pdf_view.set_pdfium(pdfium);
            }
            Err(e) => error!("Failed to bind to PDFium: {}", e),
        }
    }

    fn open_store(&self) {
        match Store::open_default() {
            Ok(store) => {
                self.imp().store.replace(Some(store));
            }
            Err(e) => warn!("AI results will not be cached: {}", e),
        }
    }

    fn setup_widgets(&self) {
        let imp = self.imp();

        self.set_titlebar(Some(imp.header_bar.widget()));

        let scrolled_window = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Automatic)
            .vscrollbar_policy(PolicyType::Automatic)
            .vexpand(true)
            .hexpand(true)
            .child(&imp.pdf_view)
            .build();

        let main_box = Box::builder().orientation(Orientation::Vertical).build();
        main_box.append(&scrolled_window);

        imp.ai_panel.set_visible(false);
        main_box.append(&imp.ai_panel);

        self.set_child(Some(&main_box));

        self.setup_header_bar();
        self.setup_ai_panel();
        self.setup_selection();
    }

    fn setup_header_bar(&self) {
        let imp = self.imp();
        let header = &imp.header_bar;

        let window_weak = self.downgrade();
        header.open_button().connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.show_open_dialog();
            }
        });

        let pdf_view = imp.pdf_view.clone();
        header.query_entry().connect_search_changed(move |entry| {
            pdf_view.set_query(&entry.text());
        });

        let pdf_view = imp.pdf_view.clone();
        header.zoom_in_button().connect_clicked(move |_| {
            pdf_view.set_zoom_level(pdf_view.zoom_level() + ZOOM_STEP);
        });

        let pdf_view = imp.pdf_view.clone();
        header.zoom_out_button().connect_clicked(move |_| {
            pdf_view.set_zoom_level(pdf_view.zoom_level() - ZOOM_STEP);
        });

        let window_weak = self.downgrade();
        header.summarize_button().connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.summarize();
            }
        });

        let window_weak = self.downgrade();
        header.translate_button().connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.translate_current_page();
            }
        });

        header
            .panel_toggle()
            .bind_property("active", &imp.ai_panel, "visible")
            .bidirectional()
            .sync_create()
            .build();
    }

    fn setup_ai_panel(&self) {
        let imp = self.imp();

        let toggle = imp.header_bar.panel_toggle().clone();
        imp.ai_panel.close_button().connect_clicked(move |_| {
            toggle.set_active(false);
        });

        // A translation block highlights its source paragraph on the translated page
        let pdf_view = imp.pdf_view.clone();
        imp.ai_panel.connect_closure(
            "block-activated",
            false,
            glib::closure_local!(move |_panel: &AiPanel, page_index: u32, source: &str| {
                pdf_view.highlight_on_page(page_index as usize, source);
            }),
        );

        let window_weak = self.downgrade();
        imp.ai_panel.connect_closure(
            "passage-activated",
            false,
            glib::closure_local!(move |_panel: &AiPanel, passage: &str| {
                if let Some(window) = window_weak.upgrade() {
                    window.show_passage(passage);
                }
            }),
        );

        let pdf_view = imp.pdf_view.clone();
        imp.ai_panel.connect_closure(
            "note-activated",
            false,
            glib::closure_local!(move |_panel: &AiPanel, page_index: u32, quote: &str| {
                pdf_view.highlight_on_page(page_index as usize, quote);
            }),
        );

        let window_weak = self.downgrade();
        imp.ai_panel.connect_closure(
            "note-edit-requested",
            false,
            glib::closure_local!(move |_panel: &AiPanel, id: i64| {
                if let Some(window) = window_weak.upgrade() {
                    window.edit_note(id);
                }
            }),
        );

        let window_weak = self.downgrade();
        imp.ai_panel.connect_closure(
            "note-delete-requested",
            false,
            glib::closure_local!(move |_panel: &AiPanel, id: i64| {
                if let Some(window) = window_weak.upgrade() {
                    window.delete_note(id);
                }
            }),
        );

        let window_weak = self.downgrade();
        imp.ai_panel.note_button().connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.save_note();
            }
        });

        let window_weak = self.downgrade();
        imp.ai_panel.notes_button().connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.show_notes();
            }
        });

        let window_weak = self.downgrade();
        imp.ai_panel.export_button().connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.export_notes();
            }
        });

        let window_weak = self.downgrade();
        imp.ai_panel.ask_button().connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.ask();
            }
        });

        let window_weak = self.downgrade();
        imp.ai_panel.entry().connect_activate(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.ask();
            }
        });

        let window_weak = self.downgrade();
        imp.ai_panel.explain_button().connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.explain_equation();
            }
        });

        let window_weak = self.downgrade();
        imp.ai_panel.cite_button().connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.lookup_citation();
            }
        });
    }

    fn setup_selection(&self) {
        let window_weak = self.downgrade();
        self.imp().pdf_view.connect_closure(
            "text-selected",
            false,
            glib::closure_local!(move |_view: &PdfView, page_index: u32, text: &str| {
                if let Some(window) = window_weak.upgrade() {
                    window
                        .imp()
                        .last_selection
                        .replace(Some((page_index as usize, text.to_string())));
                }
            }),
        );
    }

    fn show_open_dialog(&self) {
        let dialog = gtk::FileDialog::builder().title("Select a PDF").build();
        let window_weak = self.downgrade();

        dialog.open(Some(self), None::<&gio::Cancellable>, move |result| {
            if let Some(window) = window_weak.upgrade() {
                window.handle_file_dialog_result(result);
            }
        });
    }

    fn handle_file_dialog_result(&self, result: Result<gio::File, glib::Error>) {
        let file = match result {
            Ok(f) => f,
            Err(_) => return,
        };

        let path = match file.path() {
            Some(p) => p,
            None => return,
        };

        self.open_document(&path);
    }

    pub fn open_document(&self, path: &Path) {
        let imp = self.imp();

        if let Err(e) = imp.pdf_view.load_pdf(path) {
            error!(path = %path.display(), "Failed to open PDF: {}", e);
            return;
        }

        let fingerprint = match DocumentFingerprint::from_path(path) {
            Ok(fp) => Some(fp),
            Err(e) => {
                warn!("Could not fingerprint document: {}", e);
                None
            }
        };
        imp.session.borrow_mut().open(fingerprint);
        imp.last_selection.replace(None);
        imp.ai_panel.clear();
        imp.header_bar.query_entry().set_text("");
    }

    // ------------------------------------------------------------------
    // AI features
    // ------------------------------------------------------------------

    /// Run `job` on a worker thread and hand its output back on the main loop
    ///
    /// Output that arrives after another document was opened is dropped.
    fn spawn_ai<T, J, D>(&self, job: J, on_done: D)
    where
        T: Send + 'static,
        J: FnOnce(AiClient) -> T + Send + 'static,
        D: FnOnce(&Self, &SessionTicket, T) + 'static,
    {
        let client = match self.imp().client.borrow().clone() {
            Some(c) => c,
            None => return,
        };
        let ticket = self.imp().session.borrow().ticket();

        let (sender, receiver) = mpsc::channel::<T>();
        std::thread::spawn(move || {
            let _ = sender.send(job(client));
        });

        let window_weak = self.downgrade();
        let mut on_done = Some(on_done);
        glib::timeout_add_local(AI_POLL_INTERVAL, move || match receiver.try_recv() {
            Ok(result) => {
                if let (Some(window), Some(done)) = (window_weak.upgrade(), on_done.take()) {
                    let current = window.imp().session.borrow().is_current(&ticket);
                    if current {
                        done(&window, &ticket, result);
                    } else {
                        debug!("dropping AI result for a document that is no longer open");
                    }
                }
                glib::ControlFlow::Break
            }
            Err(mpsc::TryRecvError::Empty) => glib::ControlFlow::Continue,
            Err(mpsc::TryRecvError::Disconnected) => glib::ControlFlow::Break,
        });
    }

    fn show_panel(&self) {
        self.imp().header_bar.panel_toggle().set_active(true);
    }

    /// Run `op` against the store for the open document, logging failures
    fn with_store<T>(
        &self,
        what: &str,
        op: impl FnOnce(&Store, &DocumentFingerprint) -> StoreResult<T>,
    ) -> Option<T> {
        let store = self.imp().store.borrow();
        let session = self.imp().session.borrow();
        let (store, fingerprint) = (store.as_ref()?, session.fingerprint()?);

        match op(store, fingerprint) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("{} failed: {}", what, e);
                None
            }
        }
    }

    fn cached_result(&self, kind: AiKind, page_index: Option<usize>) -> Option<AiContent> {
        self.with_store("cache lookup", |store, fingerprint| {
            store.load_result(fingerprint, kind, page_index)
        })
        .flatten()
    }

    /// Cache under the document the work was started for
    fn cache_result(&self, ticket: &SessionTicket, page_index: Option<usize>, content: &AiContent) {
        let store = self.imp().store.borrow();
        if let (Some(store), Some(fingerprint)) = (store.as_ref(), ticket.fingerprint())
            && let Err(e) = store.save_result(fingerprint, page_index, content)
        {
            warn!(kind = content.kind.as_str(), "could not cache result: {}", e);
        }
    }

    fn summarize(&self) {
        let imp = self.imp();
        if !imp.pdf_view.has_document() {
            return;
        }
        self.show_panel();

        if let Some(content) = self.cached_result(AiKind::Summary, None) {
            debug!("summary served from cache");
            self.show_summary(&content);
            return;
        }

        let document_text = imp.pdf_view.document_text().unwrap_or_default();
        imp.ai_panel.set_loading(AiKind::Summary.title());
        self.spawn_ai(
            move |client| {
                client.run(&AiTask::Summary {
                    document_text: &document_text,
                })
            },
            |window, ticket, content| {
                window.cache_result(ticket, None, &content);
                window.show_summary(&content);
            },
        );
    }

    fn show_summary(&self, content: &AiContent) {
        let panel = &self.imp().ai_panel;
        match Summary::from_content(content) {
            Some(summary) => panel.show_summary(content, &summary),
            None => panel.show_content(content),
        }
    }

    /// Highlight a summary passage on whichever page contains it
    fn show_passage(&self, passage: &str) {
        let pdf_view = &self.imp().pdf_view;
        match pdf_view.find_page_for(passage) {
            Some(page_index) => {
                info!(page_index, "summary passage located");
                pdf_view.highlight_on_page(page_index, passage);
            }
            None => self
                .imp()
                .ai_panel
                .show_message("This passage was not found in the document."),
        }
    }

    fn translate_current_page(&self) {
        let imp = self.imp();
        if !imp.pdf_view.has_document() {
            return;
        }
        self.show_panel();

        let page_index = imp.pdf_view.current_page() as usize;
        if let Some(content) = self.cached_result(AiKind::Translation, Some(page_index)) {
            debug!(page_index, "translation served from cache");
            imp.ai_panel
                .show_translation(&PageTranslation::new(page_index, content));
            return;
        }

        let page_text = imp.pdf_view.page_text(page_index).unwrap_or_default();
        let target_lang = imp.settings.borrow().target_language.clone();
        info!(page_index, lang = %target_lang, "translating page");
        imp.ai_panel.set_loading(AiKind::Translation.title());
        self.spawn_ai(
            move |client| {
                translation::translate_page(&client, page_index, &page_text, &target_lang)
            },
            |window, ticket, translation: PageTranslation| {
                window.cache_result(ticket, Some(translation.page_index), &translation.content);
                window.imp().ai_panel.show_translation(&translation);
            },
        );
    }

    fn ask(&self) {
        let imp = self.imp();
        let question = match imp.ai_panel.take_input() {
            Some(q) => q,
            None => return,
        };
        self.show_panel();

        let document_text = imp.pdf_view.document_text().unwrap_or_default();
        let history = imp.session.borrow().chat_history().to_vec();
        imp.ai_panel.set_loading(AiKind::Chat.title());
        self.spawn_ai(
            {
                let question = question.clone();
                move |client| {
                    client.run(&AiTask::Chat {
                        document_text: &document_text,
                        history: &history,
                        question: &question,
                    })
                }
            },
            move |window, _ticket, content| {
                if !content.is_error {
                    window
                        .imp()
                        .session
                        .borrow_mut()
                        .record_exchange(question, content.text.clone());
                }
                window.imp().ai_panel.show_content(&content);
            },
        );
    }

    fn explain_equation(&self) {
        let imp = self.imp();
        let equation = match imp.ai_panel.take_input() {
            Some(e) => e,
            None => return,
        };
        self.show_panel();

        let page_index = imp.pdf_view.current_page() as usize;
        let context = imp.pdf_view.page_text(page_index).unwrap_or_default();
        imp.ai_panel.set_loading(AiKind::Equation.title());
        self.spawn_ai(
            move |client| {
                client.run(&AiTask::ExplainEquation {
                    equation: &equation,
                    context: &context,
                })
            },
            |window, _ticket, content| window.imp().ai_panel.show_content(&content),
        );
    }

    fn lookup_citation(&self) {
        let imp = self.imp();
        let citation = match imp.ai_panel.take_input() {
            Some(c) => c,
            None => return,
        };
        self.show_panel();

        imp.ai_panel.set_loading(AiKind::Citation.title());
        self.spawn_ai(
            move |client| client.run(&AiTask::CitationLookup { citation: &citation }),
            |window, _ticket, content| window.imp().ai_panel.show_content(&content),
        );
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    /// Save the last selection as a note, with the entry text as its body
    fn save_note(&self) {
        let imp = self.imp();
        self.show_panel();

        let Some((page_index, quote)) = imp.last_selection.borrow().clone() else {
            imp.ai_panel
                .show_message("Select text on a page before saving a note.");
            return;
        };
        let note = imp.ai_panel.take_input().unwrap_or_default();

        if let Some(id) = self.with_store("save note", |store, fingerprint| {
            store.save_note(fingerprint, page_index, &quote, &note)
        }) {
            info!(id, page_index, "note saved");
            self.show_notes();
        }
    }

    fn show_notes(&self) {
        self.show_panel();
        if let Some(notes) =
            self.with_store("load notes", |store, fingerprint| store.notes_for_document(fingerprint))
        {
            self.imp().ai_panel.show_notes(&notes);
        }
    }

    /// Replace a note's body with the entry text
    fn edit_note(&self, id: NoteId) {
        let Some(text) = self.imp().ai_panel.take_input() else {
            self.imp()
                .ai_panel
                .show_message("Type the new note text, then press edit.");
            return;
        };
        if self
            .with_store("update note", |store, _| store.update_note(id, &text))
            .is_some()
        {
            self.show_notes();
        }
    }

    fn delete_note(&self, id: NoteId) {
        if self
            .with_store("delete note", |store, _| store.delete_note(id))
            .is_some()
        {
            self.show_notes();
        }
    }

    /// Copy the document's notes to the clipboard as markdown
    fn export_notes(&self) {
        self.show_panel();
        if let Some(markdown) = self.with_store("export notes", |store, fingerprint| {
            store.export_notes_markdown(fingerprint)
        }) {
            self.clipboard().set_text(&markdown);
            self.imp()
                .ai_panel
                .show_message("Notes copied to the clipboard as markdown.");
        }
    }
}
