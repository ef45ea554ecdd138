use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::backend::Backend;
use crate::engine::models::GameInstallation;
use crate::error::InstallerError;
use crate::storage::Settings;
use crate::util::lock;

#[derive(Default)]
struct ResolverState {
    installation: Option<GameInstallation>,
    error: Option<InstallerError>,
}

/// Finds and validates the game directory, writing every accepted path through to the config.
///
/// Failures here are never fatal: they land in [`PathResolver::error`] for the caller to
/// prompt on. Calls are not deduplicated, callers serialize them.
pub struct PathResolver {
    backend: Arc<dyn Backend>,
    settings: Arc<Settings>,
    state: Mutex<ResolverState>,
}

impl PathResolver {
    pub fn new(backend: Arc<dyn Backend>, settings: Arc<Settings>) -> Self {
        Self {
            backend,
            settings,
            state: Mutex::new(ResolverState::default()),
        }
    }

    pub fn installation(&self) -> Option<GameInstallation> {
        lock(&self.state).installation.clone()
    }

    pub fn error(&self) -> Option<InstallerError> {
        lock(&self.state).error.clone()
    }

    /// Stored path first, auto-detection when it is missing or no longer valid.
    pub async fn resolve(&self) -> Option<GameInstallation> {
        if let Some(stored) = self.settings.current().game_path {
            match self.validate(&stored).await {
                Ok(installation) => return Some(self.accept(installation).await),
                Err(err) => {
                    warn!(
                        "resolve: stored path {} rejected ({err}), auto-detecting",
                        stored.display()
                    );
                }
            }
        } else {
            debug!("resolve: no stored path");
        }
        self.auto_detect().await
    }

    pub async fn auto_detect(&self) -> Option<GameInstallation> {
        let detected = match self.backend.auto_detect_game().await {
            Ok(detected) => detected,
            Err(cause) => {
                warn!("detect: probe failed: {cause}");
                None
            }
        };
        let Some(path) = detected else {
            info!("detect: game not found");
            self.set_error(InstallerError::PathNotFound);
            return None;
        };
        match self.validate(&path).await {
            Ok(installation) => Some(self.accept(installation).await),
            Err(err) => {
                self.set_error(err);
                None
            }
        }
    }

    /// Ask the user for a directory. Cancelling leaves everything as it was.
    pub async fn select_manually(&self) -> Result<Option<GameInstallation>, InstallerError> {
        let picked = self
            .backend
            .select_game_directory()
            .await
            .map_err(InstallerError::PathInvalid)?;
        let Some(path) = picked else {
            debug!("select: cancelled");
            return Ok(None);
        };
        self.use_path(&path).await.map(Some)
    }

    pub async fn use_path(&self, path: &Path) -> Result<GameInstallation, InstallerError> {
        match self.validate(path).await {
            Ok(installation) => Ok(self.accept(installation).await),
            Err(err) => {
                self.set_error(err.clone());
                Err(err)
            }
        }
    }

    /// Re-read the current directory without switching to another one.
    pub async fn refresh(&self) -> Result<GameInstallation, InstallerError> {
        let Some(path) = self.current_path() else {
            return Err(InstallerError::PathNotFound);
        };
        match self.validate(&path).await {
            Ok(installation) => {
                let mut state = lock(&self.state);
                state.installation = Some(installation.clone());
                state.error = None;
                Ok(installation)
            }
            Err(err) => {
                warn!("refresh: {} no longer valid: {err}", path.display());
                self.set_error(err.clone());
                Err(err)
            }
        }
    }

    fn current_path(&self) -> Option<PathBuf> {
        lock(&self.state)
            .installation
            .as_ref()
            .map(|installation| installation.path.clone())
    }

    async fn validate(&self, path: &Path) -> Result<GameInstallation, InstallerError> {
        let installation = self
            .backend
            .get_game_info(path)
            .await
            .map_err(InstallerError::PathInvalid)?;
        if !installation.is_valid {
            return Err(InstallerError::PathInvalid(format!(
                "{} is missing game files",
                path.display()
            )));
        }
        Ok(installation)
    }

    async fn accept(&self, installation: GameInstallation) -> GameInstallation {
        info!("resolve: using {}", installation.path.display());
        {
            let mut state = lock(&self.state);
            state.installation = Some(installation.clone());
            state.error = None;
        }
        if let Err(err) = self.settings.update_game_path(&installation.path).await {
            warn!("resolve: {err}");
        }
        installation
    }

    fn set_error(&self, err: InstallerError) {
        lock(&self.state).error = Some(err);
    }
}
