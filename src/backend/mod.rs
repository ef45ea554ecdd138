//! Command boundary to the privileged side that touches the game files and network.
//!
//! Every command resolves to `Ok` or to an `Err` carrying a message meant for the
//! user. Long-running commands also emit `(message, percent)` pairs on their
//! progress topic, but those events never signal completion.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::engine::models::{
    AppUpdateInfo, GameInstallation, InstalledTranslationRecord, TranslationCatalog,
    TranslationRelease,
};

mod files;
mod github;
mod local;

pub use local::LocalBackend;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Probe the well-known install locations.
    async fn auto_detect_game(&self) -> Result<Option<PathBuf>, String>;

    /// Ask the user for a directory; `None` when they cancel.
    async fn select_game_directory(&self) -> Result<Option<PathBuf>, String>;

    async fn validate_game_path(&self, path: &Path) -> Result<GameInstallation, String>;

    /// Like `validate_game_path`, also reading the game's own version.
    async fn get_game_info(&self, path: &Path) -> Result<GameInstallation, String>;

    async fn get_available_translations(&self) -> Result<TranslationCatalog, String>;

    async fn check_translation_updates(
        &self,
        current_version: &str,
    ) -> Result<Option<TranslationRelease>, String>;

    /// Emits on `translation-progress`.
    async fn install_translation(
        &self,
        path: &Path,
        release: &TranslationRelease,
    ) -> Result<(), String>;

    /// Emits on `translation-progress`.
    async fn update_translation(
        &self,
        path: &Path,
        release: &TranslationRelease,
    ) -> Result<(), String>;

    /// Emits on `translation-progress`.
    async fn uninstall_translation(&self, path: &Path) -> Result<(), String>;

    async fn get_translation_info(
        &self,
        path: &Path,
    ) -> Result<Option<InstalledTranslationRecord>, String>;

    async fn check_app_update(&self) -> Result<Option<AppUpdateInfo>, String>;

    /// Emits on `updater-progress`.
    async fn download_and_install_update(&self, info: &AppUpdateInfo) -> Result<(), String>;
}
