//! Glint: a PDF reader that highlights quoted passages on the page.
//!
//! The [`highlight`] module holds the toolkit-independent locator; the
//! services and widgets wire it to pdfium, GTK and an AI backend.

pub mod config;
pub mod error;
pub mod highlight;
pub mod services;
pub mod widgets;
