//! Folds backend events into the state the UI renders from.

use std::collections::VecDeque;

use shared::{domain::ScrapeForm, protocol::ProgressRender};

use crate::controller::events::UiEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub progress_visible: bool,
    pub download_visible: bool,
    pub submit_enabled: bool,
    pub sentiment_option_visible: bool,
    pub progress: ProgressRender,
    /// The page's status text (e.g. "Scraping complete!").
    pub status: String,
    /// Worker notices shown in the footer.
    pub backend_note: String,
    /// Alerts waiting to be dismissed, oldest first.
    pub alerts: VecDeque<String>,
}

impl ViewState {
    pub fn new(form: &ScrapeForm) -> Self {
        Self {
            progress_visible: false,
            download_visible: false,
            submit_enabled: true,
            sentiment_option_visible: form.include_sentiment,
            progress: ProgressRender::from_percent(0.0),
            status: String::new(),
            backend_note: String::new(),
            alerts: VecDeque::new(),
        }
    }
}

pub fn reduce(state: &mut ViewState, form: &mut ScrapeForm, event: UiEvent) {
    match event {
        UiEvent::Info(message) => state.backend_note = message,
        UiEvent::BackendFailed(message) => {
            state.submit_enabled = false;
            state.backend_note = message.clone();
            state.alerts.push_back(message);
        }
        UiEvent::ProgressVisible(visible) => state.progress_visible = visible,
        UiEvent::DownloadVisible(visible) => state.download_visible = visible,
        UiEvent::SubmitEnabled(enabled) => state.submit_enabled = enabled,
        UiEvent::SentimentOptionVisible(visible) => state.sentiment_option_visible = visible,
        UiEvent::SentimentScoreChecked(checked) => form.include_sentiment_score = checked,
        UiEvent::Progress(progress) => state.progress = progress,
        UiEvent::Status(text) => state.status = text,
        UiEvent::Alert(message) => state.alerts.push_back(message),
        UiEvent::DownloadSaved(path) => {
            state.backend_note = format!("Saved {}", path.display());
        }
    }
}
