use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with status {0}")]
    Status(reqwest::StatusCode),
    #[error("progress stream has unexpected content type: {0}")]
    UnexpectedContentType(String),
    #[error("progress stream ended before a terminal message")]
    UnexpectedEnd,
    #[error("malformed progress stream: {0}")]
    Decode(#[from] shared::sse::SseError),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to prepare download directory '{}': {source}", path.display())]
    PrepareDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid download filename: {0}")]
    InvalidFilename(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
