pub mod ai;
pub mod page_layer;
pub mod pdf_text;
pub mod session;
pub mod store;
pub mod summary;
pub mod translation;
