//! Client side of the scrape service: a form controller that streams scrape
//! progress from `/scrape` and saves the CSV from `/download`.
//!
//! Front-ends supply a [`FormView`] (field state and visibility flags), a
//! [`ScrapeTransport`] and a [`SaveTarget`]; the controller wires user actions
//! to them.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use shared::{
    domain::FormData,
    protocol::{ProgressMessage, ProgressRender},
};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};
use url::Url;

pub mod error;
pub mod save;
pub mod settings;
pub mod transport;

pub use error::{SaveError, SettingsError, TransportError};
pub use save::{download_filename, DirectorySaveTarget, SaveTarget};
pub use settings::{load_settings, ClientSettings};
pub use transport::{HttpTransport, ProgressStream, ScrapeTransport, SseProgressStream};

pub const COMPLETE_STATUS_TEXT: &str = "Scraping complete!";
pub const SETUP_FAILURE_ALERT: &str = "An error occurred. Please try again.";
pub const STREAM_FAILURE_ALERT: &str = "An error occurred while scraping. Please try again.";
pub const DOWNLOAD_FAILURE_ALERT: &str = "Error downloading file. Please try again.";

/// The page the controller drives. Calls are made from runtime tasks and must not block.
pub trait FormView: Send + Sync {
    fn form_snapshot(&self) -> FormData;
    fn set_progress_visible(&self, visible: bool);
    fn set_download_visible(&self, visible: bool);
    fn set_submit_enabled(&self, enabled: bool);
    fn set_sentiment_option_visible(&self, visible: bool);
    fn set_sentiment_score_checked(&self, checked: bool);
    fn render_progress(&self, progress: ProgressRender);
    fn set_status_text(&self, text: &str);
    fn alert(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPhase {
    Idle,
    Submitting,
    Streaming,
    Completed,
    Failed,
}

impl SubmitPhase {
    /// Terminal phases hand control back to the user just like `Idle`.
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle | Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    /// The request could not be prepared; no connection was attempted.
    Setup,
    /// The server sent `ERROR:<message>`.
    Server(String),
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed,
    Failed(SubmitFailure),
    /// The stream was torn down by [`FormController::shutdown`].
    Cancelled,
}

pub struct SubmitHandle {
    state: SubmitHandleState,
}

enum SubmitHandleState {
    Ready(SubmitOutcome),
    Running(JoinHandle<SubmitOutcome>),
}

impl SubmitHandle {
    fn ready(outcome: SubmitOutcome) -> Self {
        Self {
            state: SubmitHandleState::Ready(outcome),
        }
    }

    fn running(task: JoinHandle<SubmitOutcome>) -> Self {
        Self {
            state: SubmitHandleState::Running(task),
        }
    }

    /// Waits for the submission to reach a terminal state.
    pub async fn outcome(self) -> SubmitOutcome {
        match self.state {
            SubmitHandleState::Ready(outcome) => outcome,
            SubmitHandleState::Running(task) => match task.await {
                Ok(outcome) => outcome,
                Err(err) if err.is_cancelled() => SubmitOutcome::Cancelled,
                Err(err) => {
                    error!(%err, "progress stream task panicked");
                    SubmitOutcome::Failed(SubmitFailure::Transport)
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    Failed,
}

struct ControllerState {
    phase: SubmitPhase,
    next_stream_id: u64,
    streams: Vec<AbortHandle>,
}

pub struct FormController {
    transport: Arc<dyn ScrapeTransport>,
    view: Arc<dyn FormView>,
    save_target: Arc<dyn SaveTarget>,
    state: Mutex<ControllerState>,
}

impl FormController {
    pub fn new(
        transport: Arc<dyn ScrapeTransport>,
        view: Arc<dyn FormView>,
        save_target: Arc<dyn SaveTarget>,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            view,
            save_target,
            state: Mutex::new(ControllerState {
                phase: SubmitPhase::Idle,
                next_stream_id: 0,
                streams: Vec::new(),
            }),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: SubmitPhase) {
        self.lock_state().phase = phase;
    }

    /// Phase of the most recent transition. With overlapping submissions the
    /// last stream to change state wins.
    pub fn phase(&self) -> SubmitPhase {
        self.lock_state().phase
    }

    pub fn open_streams(&self) -> usize {
        let mut state = self.lock_state();
        state.streams.retain(|handle| !handle.is_finished());
        state.streams.len()
    }

    pub fn toggle_sentiment(&self, checked: bool) {
        self.view.set_sentiment_option_visible(checked);
        if !checked {
            self.view.set_sentiment_score_checked(false);
        }
    }

    /// Starts a scrape. Must be called from within a tokio runtime.
    ///
    /// An already running submission is not cancelled; both streams keep
    /// driving the same view.
    pub fn submit(self: &Arc<Self>) -> SubmitHandle {
        let (stream_id, already_open) = {
            let mut state = self.lock_state();
            state.streams.retain(|handle| !handle.is_finished());
            state.next_stream_id += 1;
            state.phase = SubmitPhase::Submitting;
            (state.next_stream_id, state.streams.len())
        };
        if already_open > 0 {
            warn!(
                stream_id,
                already_open, "submitting while a previous progress stream is still open"
            );
        }

        self.view.set_progress_visible(true);
        self.view.set_download_visible(false);
        self.view.set_submit_enabled(false);

        let form = self.view.form_snapshot();
        let endpoint = match self.transport.progress_endpoint(&form.to_query_string()) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                warn!(stream_id, %err, "failed to prepare progress stream");
                self.fail_submission(SETUP_FAILURE_ALERT);
                return SubmitHandle::ready(SubmitOutcome::Failed(SubmitFailure::Setup));
            }
        };

        info!(stream_id, fields = form.len(), "starting scrape");
        let task = tokio::spawn(Arc::clone(self).pump_stream(stream_id, endpoint));
        self.lock_state().streams.push(task.abort_handle());
        SubmitHandle::running(task)
    }

    async fn pump_stream(self: Arc<Self>, stream_id: u64, endpoint: Url) -> SubmitOutcome {
        let mut stream = match self.transport.open_progress_stream(endpoint).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(stream_id, %err, "progress stream failed to open");
                self.fail_submission(STREAM_FAILURE_ALERT);
                return SubmitOutcome::Failed(SubmitFailure::Transport);
            }
        };
        self.set_phase(SubmitPhase::Streaming);

        loop {
            let payload = match stream.next_message().await {
                Some(Ok(payload)) => payload,
                Some(Err(err)) => {
                    stream.close();
                    warn!(stream_id, %err, "progress stream failed");
                    self.fail_submission(STREAM_FAILURE_ALERT);
                    return SubmitOutcome::Failed(SubmitFailure::Transport);
                }
                None => {
                    stream.close();
                    warn!(stream_id, "progress stream ended without a terminal message");
                    self.fail_submission(STREAM_FAILURE_ALERT);
                    return SubmitOutcome::Failed(SubmitFailure::Transport);
                }
            };

            match ProgressMessage::parse(&payload) {
                ProgressMessage::Done => {
                    stream.close();
                    self.set_phase(SubmitPhase::Completed);
                    self.view.set_download_visible(true);
                    self.view.set_submit_enabled(true);
                    self.view.set_status_text(COMPLETE_STATUS_TEXT);
                    info!(stream_id, "scrape complete");
                    return SubmitOutcome::Completed;
                }
                ProgressMessage::Error(message) => {
                    stream.close();
                    warn!(stream_id, %message, "server reported scrape failure");
                    self.fail_submission(&message);
                    return SubmitOutcome::Failed(SubmitFailure::Server(message));
                }
                ProgressMessage::Progress(percent) => {
                    debug!(stream_id, percent, "scrape progress");
                    self.view.render_progress(ProgressRender::from_percent(percent));
                }
                ProgressMessage::Unrecognized(payload) => {
                    warn!(stream_id, %payload, "ignoring unrecognized progress payload");
                }
            }
        }
    }

    fn fail_submission(&self, alert: &str) {
        self.set_phase(SubmitPhase::Failed);
        self.view.set_submit_enabled(true);
        self.view.set_progress_visible(false);
        self.view.alert(alert);
    }

    /// Posts a fresh form snapshot to `/download` and saves the body as
    /// `reddit_posts_<date>.csv`. Allowed at any time, not only after a completed scrape.
    pub async fn download(&self) -> DownloadOutcome {
        let form = self.view.form_snapshot();
        let body = match self.transport.download(&form).await {
            Ok(body) => body,
            Err(err) => {
                warn!(%err, "download request failed");
                self.view.alert(DOWNLOAD_FAILURE_ALERT);
                return DownloadOutcome::Failed;
            }
        };

        let filename = download_filename(Utc::now());
        match self.save_target.save(&filename, &body).await {
            Ok(path) => {
                info!(path = %path.display(), bytes = body.len(), "download saved");
                DownloadOutcome::Saved(path)
            }
            Err(err) => {
                warn!(%err, %filename, "failed to save download");
                self.view.alert(DOWNLOAD_FAILURE_ALERT);
                DownloadOutcome::Failed
            }
        }
    }

    /// Tears down every open progress stream. Aborted submissions resolve to
    /// [`SubmitOutcome::Cancelled`] and leave the view untouched.
    pub fn shutdown(&self) {
        let mut state = self.lock_state();
        let open = state.streams.len();
        for handle in state.streams.drain(..) {
            handle.abort();
        }
        if !state.phase.is_idle() {
            state.phase = SubmitPhase::Idle;
        }
        drop(state);
        if open > 0 {
            info!(open, "closed progress streams on shutdown");
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
