//! Settings service.
//!
//! Resolves [`ChatSettings`] from `config.toml`, `secret.json` and the
//! environment, in that order of precedence for each concern:
//!
//! - API key: secret.json > `OPENAI_API_KEY`
//! - Model: secret.json `model_name` > `OPENAI_MODEL_NAME` > config.toml > default

use sidechat_core::config::{ChatSettings, ConfigRoot};
use sidechat_core::error::{Result, SidechatError};

use crate::paths::SidechatPaths;
use crate::storage::{ConfigStorage, SecretStorage, SecretStorageError};

const API_KEY_ENV: &str = "OPENAI_API_KEY";
const MODEL_ENV: &str = "OPENAI_MODEL_NAME";

pub struct SettingsService {
    config_storage: ConfigStorage,
    secret_storage: SecretStorage,
}

impl SettingsService {
    /// Uses the standard locations from [`SidechatPaths`].
    pub fn new(paths: &SidechatPaths) -> Result<Self> {
        let config_file = paths
            .config_file()
            .map_err(|e| SidechatError::config(e.to_string()))?;
        let secret_file = paths
            .secret_file()
            .map_err(|e| SidechatError::config(e.to_string()))?;

        Ok(Self {
            config_storage: ConfigStorage::new(config_file),
            secret_storage: SecretStorage::new(secret_file),
        })
    }

    pub fn with_storages(config_storage: ConfigStorage, secret_storage: SecretStorage) -> Self {
        Self {
            config_storage,
            secret_storage,
        }
    }

    /// Loads settings using the process environment as fallback.
    pub fn load(&self) -> Result<ChatSettings> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Loads settings with an injectable environment lookup.
    ///
    /// Missing files are fine; malformed files are errors.
    pub fn load_with_env<F>(&self, env: F) -> Result<ChatSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = self
            .config_storage
            .load()
            .map_err(|e| {
                SidechatError::config(format!(
                    "Failed to load {}: {}",
                    self.config_storage.path().display(),
                    e
                ))
            })?
            .unwrap_or_default();

        let secret = match self.secret_storage.load() {
            Ok(secret) => secret.openai,
            Err(SecretStorageError::NotFound(path)) => {
                tracing::debug!("[Settings] No secret file at {}", path.display());
                None
            }
            Err(e) => {
                return Err(SidechatError::config(format!(
                    "Failed to load {}: {}",
                    self.secret_storage.path().display(),
                    e
                )));
            }
        };

        let ConfigRoot { mut chat, search } = config;

        let api_key = secret
            .as_ref()
            .map(|s| s.api_key.clone())
            .filter(|key| !key.trim().is_empty())
            .or_else(|| env(API_KEY_ENV).filter(|key| !key.trim().is_empty()));

        if let Some(model) = secret
            .and_then(|s| s.model_name)
            .or_else(|| env(MODEL_ENV))
            .filter(|model| !model.trim().is_empty())
        {
            chat.model = model;
        }

        tracing::info!(
            "[Settings] model={} max_tokens={} credential={}",
            chat.model,
            chat.max_tokens,
            if api_key.is_some() { "present" } else { "absent" }
        );

        Ok(ChatSettings {
            api_key,
            chat,
            search,
        })
    }
}
