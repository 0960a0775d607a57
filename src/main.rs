use gtk::glib;
use gtk::prelude::*;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use glint::config::Settings;
use glint::widgets::AppWindow;

const APP_ID: &str = "org.glint.Reader";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glint=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_settings() -> Settings {
    match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Falling back to default settings: {}", e);
            Settings::default()
        }
    }
}

fn main() -> glib::ExitCode {
    init_logging();

    // A PDF path may be given as the first argument
    let initial_file: Option<PathBuf> = std::env::args_os().nth(1).map(PathBuf::from);

    let app = gtk::Application::builder()
        .application_id(APP_ID)
        .flags(gtk::gio::ApplicationFlags::NON_UNIQUE)
        .build();

    app.connect_activate(move |app| {
        let window = AppWindow::new(app, load_settings());
        if let Some(path) = &initial_file {
            info!(path = %path.display(), "opening file from command line");
            window.open_document(path);
        }
        window.present();
    });

    // Arguments were consumed above; keep GTK from parsing them
    app.run_with_args::<&str>(&[])
}
