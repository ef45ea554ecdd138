use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::fs;

use crate::engine::models::{AppConfiguration, Language};
use crate::env;
use crate::error::InstallerError;
use crate::util::lock;

/// Persistence boundary for [`AppConfiguration`]; always reads and writes the whole value.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self) -> Result<AppConfiguration, String>;
    async fn save(&self, config: &AppConfiguration) -> Result<(), String>;
}

/// JSON file under the per-user config directory.
#[derive(Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self::at(env::config_file())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> Result<AppConfiguration, String> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("config: {} missing, using defaults", self.path.display());
                return Ok(AppConfiguration::default());
            }
            Err(err) => return Err(format!("failed to read config: {err}")),
        };
        serde_json::from_slice(&bytes).map_err(|e| format!("failed to parse config: {e}"))
    }

    async fn save(&self, config: &AppConfiguration) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create config directory: {e}"))?;
        }
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("failed to serialize config: {e}"))?;
        // Write a sibling file first so a crash never leaves a truncated config.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, content)
            .await
            .map_err(|e| format!("failed to write config: {e}"))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|e| format!("failed to write config: {e}"))
    }
}

/// The single in-memory configuration, loaded once and replaced only by whole saves.
pub struct Settings {
    store: Box<dyn ConfigStore>,
    current: Mutex<AppConfiguration>,
}

impl Settings {
    pub async fn load(store: Box<dyn ConfigStore>) -> Result<Self, InstallerError> {
        let config = store
            .load()
            .await
            .map_err(InstallerError::ConfigLoadFailed)?;
        info!("config: loaded (game path: {:?})", config.game_path);
        Ok(Self {
            store,
            current: Mutex::new(config),
        })
    }

    /// Falls back to defaults when loading fails, handing the failure back to the caller.
    pub async fn load_or_default(store: Box<dyn ConfigStore>) -> (Self, Option<InstallerError>) {
        match store.load().await {
            Ok(config) => (
                Self {
                    store,
                    current: Mutex::new(config),
                },
                None,
            ),
            Err(cause) => {
                warn!("config: {cause}; continuing with defaults");
                (
                    Self {
                        store,
                        current: Mutex::new(AppConfiguration::default()),
                    },
                    Some(InstallerError::ConfigLoadFailed(cause)),
                )
            }
        }
    }

    pub fn current(&self) -> AppConfiguration {
        lock(&self.current).clone()
    }

    /// Persist `config` as a whole; the cached copy changes only once the store accepted it.
    pub async fn save(&self, config: AppConfiguration) -> Result<(), InstallerError> {
        self.store
            .save(&config)
            .await
            .map_err(InstallerError::ConfigSaveFailed)?;
        *lock(&self.current) = config;
        debug!("config: saved");
        Ok(())
    }

    async fn modify(
        &self,
        change: impl FnOnce(&mut AppConfiguration),
    ) -> Result<AppConfiguration, InstallerError> {
        let mut next = self.current();
        change(&mut next);
        self.save(next.clone()).await?;
        Ok(next)
    }

    pub async fn update_game_path(&self, path: &Path) -> Result<(), InstallerError> {
        if self.current().game_path.as_deref() == Some(path) {
            return Ok(());
        }
        info!("config: game path set to {}", path.display());
        let path = path.to_path_buf();
        self.modify(|config| config.game_path = Some(path))
            .await
            .map(|_| ())
    }

    pub async fn toggle_auto_update(&self, enabled: bool) -> Result<(), InstallerError> {
        self.modify(|config| config.auto_update = enabled)
            .await
            .map(|_| ())
    }

    pub async fn toggle_auto_start(&self, enabled: bool) -> Result<(), InstallerError> {
        self.modify(|config| config.auto_start_with_os = enabled)
            .await
            .map(|_| ())
    }

    pub async fn set_source_repository(&self, repo: &str) -> Result<(), InstallerError> {
        let repo = repo.trim().to_owned();
        self.modify(|config| config.source_repository = repo)
            .await
            .map(|_| ())
    }

    pub async fn set_language(&self, language: Language) -> Result<(), InstallerError> {
        self.modify(|config| config.language = language)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryConfigStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let store = FileConfigStore::at(dir.path().join("config.json"));
        assert_eq!(store.load().await.unwrap(), AppConfiguration::default());
    }

    #[tokio::test]
    async fn file_store_round_trips_whole_config() {
        let dir = TempDir::new().unwrap();
        let store = FileConfigStore::at(dir.path().join("nested").join("config.json"));
        let config = AppConfiguration {
            game_path: Some(PathBuf::from("/games/priconner")),
            language: Language::En,
            ..AppConfiguration::default()
        };
        store.save(&config).await.unwrap();
        assert_eq!(store.load().await.unwrap(), config);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported_not_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ broken").unwrap();

        let strict = Settings::load(Box::new(FileConfigStore::at(&path))).await;
        assert!(matches!(strict, Err(InstallerError::ConfigLoadFailed(_))));

        let (settings, err) = Settings::load_or_default(Box::new(FileConfigStore::at(&path))).await;
        assert!(matches!(err, Some(InstallerError::ConfigLoadFailed(_))));
        assert_eq!(settings.current(), AppConfiguration::default());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ broken");
    }

    #[tokio::test]
    async fn every_save_carries_the_full_config() {
        let store = MemoryConfigStore::new(AppConfiguration::default());
        let settings = Settings::load(Box::new(store.clone())).await.unwrap();

        settings.toggle_auto_update(false).await.unwrap();
        settings
            .update_game_path(Path::new("/games/priconner"))
            .await
            .unwrap();

        let saved = store.saved();
        assert_eq!(saved.len(), 2);
        assert!(!saved[1].auto_update);
        assert_eq!(saved[1].game_path, Some(PathBuf::from("/games/priconner")));
        assert_eq!(settings.current(), saved[1]);
    }

    #[tokio::test]
    async fn unchanged_game_path_is_not_rewritten() {
        let store = MemoryConfigStore::new(AppConfiguration {
            game_path: Some(PathBuf::from("/games/priconner")),
            ..AppConfiguration::default()
        });
        let settings = Settings::load(Box::new(store.clone())).await.unwrap();
        settings
            .update_game_path(Path::new("/games/priconner"))
            .await
            .unwrap();
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_cached_config() {
        let store = MemoryConfigStore::new(AppConfiguration::default());
        store.fail_saves("disk full");
        let settings = Settings::load(Box::new(store.clone())).await.unwrap();

        let err = settings.set_language(Language::Ja).await.unwrap_err();
        assert_eq!(err, InstallerError::ConfigSaveFailed("disk full".into()));
        assert_eq!(settings.current().language, Language::Vi);
    }

    #[tokio::test]
    async fn unreadable_config_falls_back_to_defaults() {
        let store = MemoryConfigStore::failing_load("permission denied");
        assert_eq!(
            Settings::load(Box::new(store.clone())).await.err(),
            Some(InstallerError::ConfigLoadFailed("permission denied".into()))
        );

        let (settings, err) = Settings::load_or_default(Box::new(store.clone())).await;
        assert_eq!(
            err,
            Some(InstallerError::ConfigLoadFailed("permission denied".into()))
        );
        assert_eq!(settings.current(), AppConfiguration::default());

        settings.toggle_auto_update(false).await.unwrap();
        assert!(!store.saved()[0].auto_update);
    }
}
