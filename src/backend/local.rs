use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::backend::files;
use crate::backend::github::GitHubClient;
use crate::backend::Backend;
use crate::engine::models::{
    AppUpdateInfo, GameInstallation, InstalledTranslationRecord, TranslationCatalog,
    TranslationRelease,
};
use crate::engine::progress::{ProgressBridge, ProgressEmitter, ProgressTopic};
use crate::env;
use crate::networking::Downloader;
use crate::process;
use crate::util::{format_bytes, scaled_percent};

// Archive, extracted copy and the files placed in the game directory.
const SPACE_FACTOR: u64 = 3;

/// Backend that works directly on the local file system and GitHub releases.
pub struct LocalBackend {
    github: GitHubClient,
    downloader: Downloader,
    translation_progress: ProgressEmitter,
    updater_progress: ProgressEmitter,
    app_version: String,
}

impl LocalBackend {
    pub fn new(repo: impl Into<String>, bridge: &ProgressBridge) -> Self {
        Self {
            github: GitHubClient::new(repo),
            downloader: Downloader::new(),
            translation_progress: bridge.emitter(ProgressTopic::Translation),
            updater_progress: bridge.emitter(ProgressTopic::Updater),
            app_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    async fn apply_release(
        &self,
        game_dir: &Path,
        release: &TranslationRelease,
    ) -> Result<(), String> {
        let progress = &self.translation_progress;
        let installation = files::inspect_game_dir(game_dir, false)?;
        progress.emit("Preparing...", 0.0);
        ensure_free_space(game_dir, release.file_size_bytes)?;

        let temp_dir = env::translation_temp_dir();
        std::fs::create_dir_all(&temp_dir)
            .map_err(|e| format!("failed to create temp directory: {e}"))?;
        let result = self
            .apply_release_in(&temp_dir, &installation, release)
            .await;
        if result.is_ok() {
            progress.emit("Cleaning up...", 95.0);
        }
        if let Err(err) = files::remove_path(&temp_dir) {
            warn!("install: temp cleanup failed: {err}");
        }
        result?;
        progress.emit("Done!", 100.0);
        info!(
            "install: {} applied to {}",
            release.version,
            game_dir.display()
        );
        Ok(())
    }

    async fn apply_release_in(
        &self,
        temp_dir: &Path,
        installation: &GameInstallation,
        release: &TranslationRelease,
    ) -> Result<(), String> {
        let progress = &self.translation_progress;
        let game_dir = installation.path.as_path();

        progress.emit("Downloading translation...", 10.0);
        let archive = temp_dir.join(format!("translation_{}.zip", release.version));
        let download_progress = progress.clone();
        self.downloader
            .download_to_path(
                &release.download_url,
                &archive,
                Some(release.file_size_bytes),
                move |step| {
                    download_progress.emit(
                        format!("Downloading... {}", step.speed_text()),
                        scaled_percent(step.downloaded, step.total, 10.0, 40.0),
                    );
                },
            )
            .await?;

        progress.emit("Extracting...", 50.0);
        let extracted = temp_dir.join("extracted");
        let unpacked = files::extract_zip(&archive, &extracted)?;
        debug!("install: unpacked {unpacked} files from {}", archive.display());

        progress.emit("Backing up previous translation...", 60.0);
        if installation.has_translation {
            files::backup_translation(game_dir)?;
        }

        progress.emit("Removing previous translation...", 70.0);
        files::remove_translation(game_dir)?;

        progress.emit("Installing translation...", 80.0);
        files::copy_translation_files(&extracted, game_dir)?;

        progress.emit("Finishing...", 90.0);
        files::write_marker(game_dir, &release.version)?;
        Ok(())
    }
}

fn ensure_free_space(game_dir: &Path, archive_size: u64) -> Result<(), String> {
    let required = archive_size.saturating_mul(SPACE_FACTOR);
    match files::available_space(game_dir) {
        Some(free) if free < required => Err(format!(
            "not enough disk space: {} required, {} available",
            format_bytes(required),
            format_bytes(free)
        )),
        Some(_) => Ok(()),
        None => {
            debug!("install: free space unknown for {}", game_dir.display());
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn auto_detect_game(&self) -> Result<Option<PathBuf>, String> {
        let Some(home) = env::home_dir() else {
            return Ok(None);
        };
        // DMM installs into <home>/priconner by default.
        let candidate = home.join("priconner");
        if candidate.is_dir() && files::inspect_game_dir(&candidate, false).is_ok() {
            return Ok(Some(candidate));
        }
        debug!("detect: nothing at {}", candidate.display());
        Ok(None)
    }

    async fn select_game_directory(&self) -> Result<Option<PathBuf>, String> {
        tokio::task::spawn_blocking(|| {
            rfd::FileDialog::new()
                .set_title("Select the Princess Connect! Re:Dive folder")
                .pick_folder()
        })
        .await
        .map_err(|e| format!("directory picker failed: {e}"))
    }

    async fn validate_game_path(&self, path: &Path) -> Result<GameInstallation, String> {
        files::inspect_game_dir(path, false)
    }

    async fn get_game_info(&self, path: &Path) -> Result<GameInstallation, String> {
        files::inspect_game_dir(path, true)
    }

    async fn get_available_translations(&self) -> Result<TranslationCatalog, String> {
        self.github.translation_catalog().await
    }

    async fn check_translation_updates(
        &self,
        current_version: &str,
    ) -> Result<Option<TranslationRelease>, String> {
        self.github.translation_update(current_version).await
    }

    async fn install_translation(
        &self,
        path: &Path,
        release: &TranslationRelease,
    ) -> Result<(), String> {
        self.apply_release(path, release).await
    }

    async fn update_translation(
        &self,
        path: &Path,
        release: &TranslationRelease,
    ) -> Result<(), String> {
        self.apply_release(path, release).await
    }

    async fn uninstall_translation(&self, path: &Path) -> Result<(), String> {
        let progress = &self.translation_progress;
        files::inspect_game_dir(path, false)?;
        progress.emit("Backing up translation...", 20.0);
        files::backup_translation(path)?;
        progress.emit("Removing translation files...", 60.0);
        files::remove_translation(path)?;
        files::remove_marker(path)?;
        progress.emit("Translation removed", 100.0);
        info!("uninstall: translation removed from {}", path.display());
        Ok(())
    }

    async fn get_translation_info(
        &self,
        path: &Path,
    ) -> Result<Option<InstalledTranslationRecord>, String> {
        Ok(files::read_marker(path))
    }

    async fn check_app_update(&self) -> Result<Option<AppUpdateInfo>, String> {
        self.github.app_update(&self.app_version).await
    }

    async fn download_and_install_update(&self, info: &AppUpdateInfo) -> Result<(), String> {
        let progress = &self.updater_progress;
        progress.emit("Preparing...", 0.0);

        let temp_dir = env::update_temp_dir();
        std::fs::create_dir_all(&temp_dir)
            .map_err(|e| format!("failed to create temp directory: {e}"))?;
        let file_name = info
            .download_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("installer.msi");
        let installer = temp_dir.join(file_name);

        progress.emit("Downloading update...", 10.0);
        let download_progress = progress.clone();
        self.downloader
            .download_to_path(
                &info.download_url,
                &installer,
                Some(info.file_size_bytes),
                move |step| {
                    download_progress.emit(
                        format!("Downloading... {}", step.speed_text()),
                        scaled_percent(step.downloaded, step.total, 10.0, 80.0),
                    );
                },
            )
            .await?;
        progress.emit("Download complete", 100.0);

        process::launch_installer(&installer)
    }
}
