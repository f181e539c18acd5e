//! Events sent from the backend worker to the UI thread.

use std::path::PathBuf;

use shared::protocol::ProgressRender;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Info(String),
    /// The worker could not start; no command will be processed.
    BackendFailed(String),
    ProgressVisible(bool),
    DownloadVisible(bool),
    SubmitEnabled(bool),
    SentimentOptionVisible(bool),
    SentimentScoreChecked(bool),
    Progress(ProgressRender),
    Status(String),
    Alert(String),
    DownloadSaved(PathBuf),
}
