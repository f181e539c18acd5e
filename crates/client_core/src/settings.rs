use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::error::SettingsError;

pub const SETTINGS_FILE: &str = "scrape_client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub download_dir: PathBuf,
    pub log_filter: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            log_filter: "info".into(),
        }
    }
}

impl ClientSettings {
    pub fn apply_file(&mut self, file_cfg: &HashMap<String, String>) {
        if let Some(v) = non_empty(file_cfg.get("server_url").cloned()) {
            self.server_url = v;
        }
        if let Some(v) = non_empty(file_cfg.get("download_dir").cloned()) {
            self.download_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty(file_cfg.get("log_filter").cloned()) {
            self.log_filter = v;
        }
    }

    /// Environment overrides; `APP__*` names win over the plain ones.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| non_empty(lookup(name));

        if let Some(v) = var("SCRAPE_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = var("APP__SERVER_URL") {
            self.server_url = v;
        }

        if let Some(v) = var("SCRAPE_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(v);
        }
        if let Some(v) = var("APP__DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(v);
        }

        if let Some(v) = var("APP__LOG_FILTER") {
            self.log_filter = v;
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Defaults, then `scrape_client.toml` from the working directory, then the environment.
pub fn load_settings() -> Result<ClientSettings, SettingsError> {
    load_settings_from(Path::new(SETTINGS_FILE), |name| std::env::var(name).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings, SettingsError> {
    let mut settings = ClientSettings::default();
    if let Some(file_cfg) = read_settings_file(path)? {
        settings.apply_file(&file_cfg);
    }
    settings.apply_env(env);
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<Option<HashMap<String, String>>, SettingsError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file_cfg = toml::from_str::<HashMap<String, String>>(&raw).map_err(|source| {
        SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(Some(file_cfg))
}
