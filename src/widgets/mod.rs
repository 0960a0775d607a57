mod ai_panel;
mod app_header_bar;
mod app_window;
mod highlight_overlay;
mod pdf_view;

pub use ai_panel::AiPanel;
pub use app_header_bar::AppHeaderBar;
pub use app_window::AppWindow;
pub use highlight_overlay::HighlightOverlay;
pub use pdf_view::PdfView;
