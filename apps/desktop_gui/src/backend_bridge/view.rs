//! [`FormView`] that forwards every page update to the UI thread.

use std::sync::{Mutex, MutexGuard, PoisonError};

use client_core::FormView;
use crossbeam_channel::{Sender, TrySendError};
use shared::{
    domain::{FormData, ScrapeForm},
    protocol::ProgressRender,
};

use crate::controller::events::UiEvent;

/// The UI owns the editable form; the worker keeps the copy that came with
/// the last command so the controller can snapshot it synchronously.
pub struct ChannelFormView {
    form: Mutex<ScrapeForm>,
    ui_tx: Sender<UiEvent>,
}

impl ChannelFormView {
    pub fn new(ui_tx: Sender<UiEvent>) -> Self {
        Self {
            form: Mutex::new(ScrapeForm::default()),
            ui_tx,
        }
    }

    fn lock_form(&self) -> MutexGuard<'_, ScrapeForm> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The score checkbox is cleared when its parent is unchecked, whatever
    /// the UI sent.
    pub fn replace_form(&self, mut form: ScrapeForm) {
        form.apply_sentiment_toggle(form.include_sentiment);
        *self.lock_form() = form;
    }

    pub fn set_include_sentiment(&self, checked: bool) {
        self.lock_form().include_sentiment = checked;
    }

    /// Progress updates are skipped while the UI queue is full, since the next
    /// one supersedes them. Every other update waits for room.
    fn emit(&self, event: UiEvent) {
        if let UiEvent::Progress(_) = event {
            match self.ui_tx.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                Err(TrySendError::Full(event)) => {
                    tracing::debug!(?event, "ui event queue full; skipping progress update");
                }
            }
            return;
        }
        if self.ui_tx.send(event).is_err() {
            tracing::debug!("ui closed; dropping update");
        }
    }
}

impl FormView for ChannelFormView {
    fn form_snapshot(&self) -> FormData {
        self.lock_form().to_form_data()
    }

    fn set_progress_visible(&self, visible: bool) {
        self.emit(UiEvent::ProgressVisible(visible));
    }

    fn set_download_visible(&self, visible: bool) {
        self.emit(UiEvent::DownloadVisible(visible));
    }

    fn set_submit_enabled(&self, enabled: bool) {
        self.emit(UiEvent::SubmitEnabled(enabled));
    }

    fn set_sentiment_option_visible(&self, visible: bool) {
        self.emit(UiEvent::SentimentOptionVisible(visible));
    }

    fn set_sentiment_score_checked(&self, checked: bool) {
        self.lock_form().include_sentiment_score = checked;
        self.emit(UiEvent::SentimentScoreChecked(checked));
    }

    fn render_progress(&self, progress: ProgressRender) {
        self.emit(UiEvent::Progress(progress));
    }

    fn set_status_text(&self, text: &str) {
        self.emit(UiEvent::Status(text.to_string()));
    }

    fn alert(&self, message: &str) {
        self.emit(UiEvent::Alert(message.to_string()));
    }
}
