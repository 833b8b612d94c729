//! `config.toml` storage.

use sidechat_core::config::ConfigRoot;
use std::fs;
use std::path::PathBuf;

/// Errors that can occur during config storage operations.
#[derive(Debug)]
pub enum ConfigStorageError {
    /// File I/O error.
    IoError(std::io::Error),
    /// TOML parsing error.
    TomlParseError(toml::de::Error),
}

impl std::fmt::Display for ConfigStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigStorageError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigStorageError::TomlParseError(e) => write!(f, "TOML parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigStorageError {}

impl From<std::io::Error> for ConfigStorageError {
    fn from(e: std::io::Error) -> Self {
        ConfigStorageError::IoError(e)
    }
}

impl From<toml::de::Error> for ConfigStorageError {
    fn from(e: toml::de::Error) -> Self {
        ConfigStorageError::TomlParseError(e)
    }
}

/// Read-only access to `config.toml`.
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the config file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ConfigRoot))`: Parsed, with defaults for omitted keys
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read or parse the file
    pub fn load(&self) -> Result<Option<ConfigRoot>, ConfigStorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(toml::from_str(&content)?))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_and_empty_files_are_none() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");

        let storage = ConfigStorage::new(file_path.clone());
        assert!(storage.load().unwrap().is_none());

        fs::write(&file_path, "   \n").unwrap();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_load_valid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        fs::write(
            &file_path,
            r#"
            [chat]
            model = "gpt-4o"
            max_tokens = 512

            [search]
            ignored_dirs = ["vendor"]
            "#,
        )
        .unwrap();

        let config = ConfigStorage::new(file_path).load().unwrap().unwrap();
        assert_eq!(config.chat.model, "gpt-4o");
        assert_eq!(config.chat.max_tokens, 512);
        assert_eq!(config.search.ignored_dirs, vec!["vendor".to_string()]);
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        fs::write(&file_path, "[chat\nmodel = ").unwrap();

        let result = ConfigStorage::new(file_path).load();
        assert!(matches!(result, Err(ConfigStorageError::TomlParseError(_))));
    }
}
