use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::paths;

/// Settings for one model provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model id used when the model reference names only the provider
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `provider:model_id`, or a bare provider name
    pub model: Option<String>,
    pub dialog_save_path: PathBuf,
    pub message_export_path: PathBuf,
    pub agents_dir: PathBuf,
    pub request_timeout_secs: Option<u64>,
    pub providers: BTreeMap<String, ProviderConfig>,
}

const CONFIG_FILE_PATH: &str = "config.toml";

impl Default for Config {
    fn default() -> Self {
        Self {
            model: None,
            dialog_save_path: paths::default_dialogs_dir(),
            message_export_path: paths::default_export_dir(),
            agents_dir: paths::default_agents_dir(),
            request_timeout_secs: None,
            providers: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from `~/.underdog/config.json`, falling back to `./config.toml`,
    /// then apply environment overrides.
    pub fn new() -> Self {
        let mut config = Self::from_files(&paths::config_json_path(), Path::new(CONFIG_FILE_PATH));
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Read the first config file that parses; defaults when none does.
    pub fn from_files(json_path: &Path, toml_path: &Path) -> Self {
        if json_path.exists() {
            match std::fs::read_to_string(json_path) {
                Ok(content) => match serde_json::from_str::<Config>(&content) {
                    Ok(config) => {
                        log::debug!("Loaded config from {}", json_path.display());
                        return config;
                    }
                    Err(e) => log::warn!("Failed to parse {}: {}", json_path.display(), e),
                },
                Err(e) => log::warn!("Failed to read {}: {}", json_path.display(), e),
            }
        }

        if toml_path.exists() {
            match std::fs::read_to_string(toml_path) {
                Ok(content) => match toml::from_str::<Config>(&content) {
                    Ok(config) => {
                        log::debug!("Loaded config from {}", toml_path.display());
                        return config;
                    }
                    Err(e) => log::warn!("Failed to parse {}: {}", toml_path.display(), e),
                },
                Err(e) => log::warn!("Failed to read {}: {}", toml_path.display(), e),
            }
        }

        Config::default()
    }

    /// Environment overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("DIALOG_MODEL") {
            self.model = Some(model);
        }
        if let Some(path) = lookup("DIALOG_SAVE_PATH") {
            self.dialog_save_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("DIALOG_EXPORT_PATH") {
            self.message_export_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("DIALOG_AGENTS_DIR") {
            self.agents_dir = PathBuf::from(path);
        }
        if let Some(timeout) = lookup("DIALOG_REQUEST_TIMEOUT") {
            match timeout.trim().parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = Some(secs),
                Err(_) => log::warn!("Ignoring invalid DIALOG_REQUEST_TIMEOUT: {timeout}"),
            }
        }
        for (name, provider) in self.providers.iter_mut() {
            let key = format!("{}_API_KEY", name.to_ascii_uppercase().replace('-', "_"));
            if let Some(api_key) = lookup(&key) {
                provider.api_key = api_key;
            }
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }
}
