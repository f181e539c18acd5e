use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::domain::{ScrapeForm, DEFAULT_MAX_POSTS};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::UiEvent,
    orchestration::dispatch_backend_command,
    reducer::{reduce, ViewState},
};

pub const SETTINGS_STORAGE_KEY: &str = "desktop_gui.form";

/// Form fields remembered between launches. Credentials are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedFormSettings {
    subreddit: String,
    max_posts: u32,
    include_sentiment: bool,
    include_sentiment_score: bool,
}

impl Default for PersistedFormSettings {
    fn default() -> Self {
        Self {
            subreddit: String::new(),
            max_posts: DEFAULT_MAX_POSTS,
            include_sentiment: false,
            include_sentiment_score: false,
        }
    }
}

impl PersistedFormSettings {
    fn from_form(form: &ScrapeForm) -> Self {
        Self {
            subreddit: form.subreddit.clone(),
            max_posts: form.max_posts,
            include_sentiment: form.include_sentiment,
            include_sentiment_score: form.include_sentiment_score,
        }
    }

    fn into_form(self) -> ScrapeForm {
        let mut form = ScrapeForm {
            subreddit: self.subreddit,
            max_posts: self.max_posts,
            include_sentiment_score: self.include_sentiment_score,
            ..Default::default()
        };
        form.apply_sentiment_toggle(self.include_sentiment);
        form
    }
}

/// Reads the form settings written by [`ScraperApp`]'s `save`.
pub fn load_persisted_form(storage: Option<&dyn eframe::Storage>) -> Option<PersistedFormSettings> {
    let text = storage?.get_string(SETTINGS_STORAGE_KEY)?;
    match serde_json::from_str(&text) {
        Ok(settings) => Some(settings),
        Err(err) => {
            tracing::warn!(%err, "ignoring unreadable saved form settings");
            None
        }
    }
}

pub struct ScraperApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    server_url: String,
    form: ScrapeForm,
    view: ViewState,
}

impl ScraperApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        server_url: String,
        persisted: Option<PersistedFormSettings>,
    ) -> Self {
        let form = persisted.unwrap_or_default().into_form();
        let view = ViewState::new(&form);
        Self {
            cmd_tx,
            ui_rx,
            server_url,
            form,
            view,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            reduce(&mut self.view, &mut self.form, event);
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.view.backend_note);
    }

    /// Applies the cascade locally before telling the worker, so a submit in
    /// the same frame already carries the cleared score checkbox.
    fn sentiment_toggled(&mut self, checked: bool) {
        self.form.apply_sentiment_toggle(checked);
        self.dispatch(BackendCommand::ToggleSentiment { checked });
    }

    fn form_text_field(ui: &mut egui::Ui, label: &str, value: &mut String, secret: bool) {
        ui.label(egui::RichText::new(label).strong());
        ui.add(
            egui::TextEdit::singleline(value)
                .password(secret)
                .desired_width(f32::INFINITY),
        );
        ui.end_row();
    }

    fn show_form(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("scrape_form")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                Self::form_text_field(ui, "Client ID", &mut self.form.client_id, false);
                Self::form_text_field(ui, "Client Secret", &mut self.form.client_secret, true);
                Self::form_text_field(ui, "Username", &mut self.form.username, false);
                Self::form_text_field(ui, "Password", &mut self.form.password, true);
                Self::form_text_field(ui, "Subreddit", &mut self.form.subreddit, false);

                ui.label(egui::RichText::new("Max Posts").strong());
                ui.add(egui::DragValue::new(&mut self.form.max_posts).speed(1.0));
                ui.end_row();
            });

        ui.add_space(6.0);
        if ui
            .checkbox(&mut self.form.include_sentiment, "Include sentiment analysis")
            .changed()
        {
            self.sentiment_toggled(self.form.include_sentiment);
        }
        if self.view.sentiment_option_visible {
            ui.indent("sentiment_score_option", |ui| {
                ui.checkbox(
                    &mut self.form.include_sentiment_score,
                    "Include sentiment score",
                );
            });
        }
    }

    fn show_actions(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let scrape = egui::Button::new(egui::RichText::new("Scrape").strong())
                .min_size(egui::vec2(120.0, 32.0));
            if ui.add_enabled(self.view.submit_enabled, scrape).clicked() {
                let form = self.form.clone();
                self.dispatch(BackendCommand::Submit { form });
            }

            if self.view.download_visible && ui.button("Download CSV").clicked() {
                let form = self.form.clone();
                self.dispatch(BackendCommand::Download { form });
            }
        });

        if self.view.progress_visible {
            ui.add_space(6.0);
            let fraction = (self.view.progress.width_percent / 100.0).clamp(0.0, 1.0) as f32;
            ui.add(egui::ProgressBar::new(fraction).text(self.view.progress.label.clone()));
        }

        if !self.view.status.is_empty() {
            ui.add_space(4.0);
            ui.label(egui::RichText::new(&self.view.status).strong());
        }
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.view.alerts.front().cloned() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Alert")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message.as_str());
                ui.add_space(6.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.view.alerts.pop_front();
        }
    }
}

impl eframe::App for ScraperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        egui::TopBottomPanel::bottom("status_footer").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.small(format!("Server: {}", self.server_url));
                ui.separator();
                ui.small(egui::RichText::new(&self.view.backend_note).weak());
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Reddit Scraper");
            ui.add_space(8.0);
            self.show_form(ui);
            ui.add_space(10.0);
            ui.separator();
            self.show_actions(ui);
        });

        self.show_alert(ctx);

        if self.view.progress_visible && !self.view.submit_enabled {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedFormSettings::from_form(&self.form);
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend_bridge::view::ChannelFormView;
    use client_core::FormView;

    fn filled_form() -> ScrapeForm {
        ScrapeForm {
            client_id: "id".into(),
            client_secret: "hunter2-secret".into(),
            username: "alice".into(),
            password: "hunter2-password".into(),
            subreddit: "rust".into(),
            max_posts: 25,
            include_sentiment: true,
            include_sentiment_score: true,
        }
    }

    #[test]
    fn persisted_settings_never_contain_credentials() {
        let serialized =
            serde_json::to_string(&PersistedFormSettings::from_form(&filled_form())).expect("json");

        assert!(!serialized.contains("hunter2"));
        assert!(!serialized.contains("alice"));
        assert!(serialized.contains("\"subreddit\":\"rust\""));
    }

    #[test]
    fn persisted_settings_restore_non_secret_fields() {
        let restored = PersistedFormSettings::from_form(&filled_form()).into_form();

        assert_eq!(restored.subreddit, "rust");
        assert_eq!(restored.max_posts, 25);
        assert!(restored.include_sentiment);
        assert!(restored.include_sentiment_score);
        assert!(restored.client_secret.is_empty());
        assert!(restored.password.is_empty());
    }

    #[test]
    fn restored_score_requires_sentiment() {
        let settings: PersistedFormSettings = serde_json::from_str(
            r#"{"include_sentiment": false, "include_sentiment_score": true}"#,
        )
        .expect("json");

        let form = settings.into_form();

        assert!(!form.include_sentiment_score);
        assert_eq!(form.max_posts, DEFAULT_MAX_POSTS);
    }

    #[test]
    fn backend_events_drive_view_and_form() {
        let (cmd_tx, _cmd_rx) = crossbeam_channel::bounded(4);
        let (ui_tx, ui_rx) = crossbeam_channel::bounded(4);
        let mut app = ScraperApp::new(
            cmd_tx,
            ui_rx,
            "http://127.0.0.1:5000".into(),
            Some(PersistedFormSettings::from_form(&filled_form())),
        );
        assert!(app.view.sentiment_option_visible);

        ui_tx
            .try_send(UiEvent::SentimentScoreChecked(false))
            .expect("send");
        ui_tx
            .try_send(UiEvent::Alert("An error occurred. Please try again.".into()))
            .expect("send");
        app.process_ui_events();

        assert!(!app.form.include_sentiment_score);
        assert_eq!(app.view.alerts.len(), 1);
    }

    #[test]
    fn submit_dispatch_carries_current_form() {
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(4);
        let (_ui_tx, ui_rx) = crossbeam_channel::bounded(4);
        let mut app = ScraperApp::new(cmd_tx, ui_rx, "http://127.0.0.1:5000".into(), None);
        app.form.subreddit = "golang".into();

        app.dispatch(BackendCommand::Submit {
            form: app.form.clone(),
        });

        match cmd_rx.try_recv() {
            Ok(BackendCommand::Submit { form }) => assert_eq!(form.subreddit, "golang"),
            _ => panic!("expected a submit command"),
        }
    }

    #[test]
    fn submit_right_after_unchecking_sentiment_omits_score() {
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(4);
        let (ui_tx, ui_rx) = crossbeam_channel::bounded(4);
        let mut app = ScraperApp::new(
            cmd_tx,
            ui_rx,
            "http://127.0.0.1:5000".into(),
            Some(PersistedFormSettings::from_form(&filled_form())),
        );

        app.form.include_sentiment = false;
        app.sentiment_toggled(false);
        app.dispatch(BackendCommand::Submit {
            form: app.form.clone(),
        });

        let worker_view = ChannelFormView::new(ui_tx);
        for cmd in cmd_rx.try_iter() {
            match cmd {
                BackendCommand::ToggleSentiment { checked } => {
                    worker_view.set_include_sentiment(checked)
                }
                BackendCommand::Submit { form } => worker_view.replace_form(form),
                _ => panic!("unexpected command"),
            }
        }
        let snapshot = worker_view.form_snapshot();
        assert_eq!(snapshot.get("include_sentiment"), None);
        assert_eq!(snapshot.get("include_sentiment_score"), None);
        assert_eq!(snapshot.get("subreddit"), Some("rust"));
    }

    #[derive(Default)]
    struct MemoryStorage(std::collections::HashMap<String, String>);

    impl eframe::Storage for MemoryStorage {
        fn get_string(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }

        fn set_string(&mut self, key: &str, value: String) {
            self.0.insert(key.to_string(), value);
        }

        fn flush(&mut self) {}
    }

    #[test]
    fn saved_form_is_restored_on_next_launch() {
        let (cmd_tx, _cmd_rx) = crossbeam_channel::bounded(4);
        let (_ui_tx, ui_rx) = crossbeam_channel::bounded(4);
        let mut app = ScraperApp::new(cmd_tx, ui_rx, "http://127.0.0.1:5000".into(), None);
        app.form = filled_form();
        let mut storage = MemoryStorage::default();

        eframe::App::save(&mut app, &mut storage);
        let restored =
            load_persisted_form(Some(&storage as &dyn eframe::Storage)).expect("saved settings");

        assert_eq!(restored, PersistedFormSettings::from_form(&filled_form()));
        assert!(!storage.0[SETTINGS_STORAGE_KEY].contains("hunter2"));
    }

    #[test]
    fn unreadable_or_missing_settings_are_ignored() {
        let mut storage = MemoryStorage::default();
        assert_eq!(load_persisted_form(Some(&storage as &dyn eframe::Storage)), None);
        assert_eq!(load_persisted_form(None), None);

        storage.0.insert(SETTINGS_STORAGE_KEY.to_string(), "not json".into());
        assert_eq!(load_persisted_form(Some(&storage as &dyn eframe::Storage)), None);
    }
}
