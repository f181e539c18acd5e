use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::SaveError;

pub const DOWNLOAD_FILENAME_PREFIX: &str = "reddit_posts_";
pub const DOWNLOAD_FILENAME_EXTENSION: &str = "csv";

/// `reddit_posts_YYYY-MM-DD.csv`, dated in UTC.
pub fn download_filename(now: DateTime<Utc>) -> String {
    format!(
        "{DOWNLOAD_FILENAME_PREFIX}{}.{DOWNLOAD_FILENAME_EXTENSION}",
        now.format("%Y-%m-%d")
    )
}

/// Where downloaded payloads end up.
#[async_trait]
pub trait SaveTarget: Send + Sync {
    async fn save(&self, filename: &str, contents: &[u8]) -> Result<PathBuf, SaveError>;
}

/// Saves into a directory, staging through a `.part` file that never outlives the call.
#[derive(Debug, Clone)]
pub struct DirectorySaveTarget {
    dir: PathBuf,
}

impl DirectorySaveTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SaveTarget for DirectorySaveTarget {
    async fn save(&self, filename: &str, contents: &[u8]) -> Result<PathBuf, SaveError> {
        if filename.is_empty() || Path::new(filename).file_name() != Some(OsStr::new(filename)) {
            return Err(SaveError::InvalidFilename(filename.to_string()));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SaveError::PrepareDir {
                path: self.dir.clone(),
                source,
            })?;

        let final_path = self.dir.join(filename);
        let staging_path = self.dir.join(format!("{filename}.part"));

        let written = match tokio::fs::write(&staging_path, contents).await {
            Ok(()) => tokio::fs::rename(&staging_path, &final_path).await,
            Err(err) => Err(err),
        };
        if let Err(source) = written {
            let _ = tokio::fs::remove_file(&staging_path).await;
            return Err(SaveError::Write {
                path: final_path,
                source,
            });
        }

        debug!(path = %final_path.display(), bytes = contents.len(), "saved download");
        Ok(final_path)
    }
}
