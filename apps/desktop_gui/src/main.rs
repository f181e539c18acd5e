mod backend_bridge;
mod controller;
mod ui;

use client_core::{load_settings, ClientSettings};
use crossbeam_channel::bounded;
use eframe::egui;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::{load_persisted_form, ScraperApp};

fn main() -> eframe::Result<()> {
    let (settings, settings_error) = match load_settings() {
        Ok(settings) => (settings, None),
        Err(err) => (ClientSettings::default(), Some(err)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();
    if let Some(err) = settings_error {
        tracing::warn!(%err, "falling back to default settings");
    }

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(1024);
    let server_url = settings.server_url.clone();
    backend_bridge::runtime::launch(cmd_rx, ui_tx, settings);

    let shutdown_tx = cmd_tx.clone();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Reddit Scraper")
            .with_inner_size([520.0, 560.0])
            .with_min_inner_size([420.0, 460.0]),
        ..Default::default()
    };
    let result = eframe::run_native(
        "Reddit Scraper",
        options,
        Box::new(|cc| {
            let persisted = load_persisted_form(cc.storage);
            Ok(Box::new(ScraperApp::new(cmd_tx, ui_rx, server_url, persisted)))
        }),
    );

    let _ = shutdown_tx.try_send(BackendCommand::Shutdown);
    result
}
