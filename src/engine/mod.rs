use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::backend::Backend;
use crate::catalog::CatalogClient;
use crate::engine::controller::InstallationController;
use crate::engine::models::{GameInstallation, TranslationRelease};
use crate::engine::progress::ProgressBridge;
use crate::engine::state::{EngineUpdate, InstallAction, UserAction};
use crate::error::InstallerError;
use crate::game::PathResolver;
use crate::storage::Settings;
use crate::updater::AppUpdateController;
use crate::util::lock;

pub mod controller;
pub mod models;
pub mod progress;
pub mod state;

/// Wires the resolver, catalog and both controllers around one backend.
pub struct InstallerEngine {
    settings: Arc<Settings>,
    resolver: PathResolver,
    catalog: Arc<CatalogClient>,
    controller: InstallationController,
    app_updater: AppUpdateController,
    selected: Mutex<Option<String>>,
}

impl InstallerEngine {
    pub fn new(
        backend: Arc<dyn Backend>,
        bridge: ProgressBridge,
        settings: Arc<Settings>,
        updates: Option<mpsc::UnboundedSender<EngineUpdate>>,
    ) -> Self {
        let catalog = Arc::new(CatalogClient::new(backend.clone()));
        Self {
            resolver: PathResolver::new(backend.clone(), settings.clone()),
            controller: InstallationController::new(
                backend.clone(),
                bridge.clone(),
                catalog.clone(),
                updates.clone(),
            ),
            app_updater: AppUpdateController::new(backend, bridge, updates),
            catalog,
            settings,
            selected: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub fn controller(&self) -> &InstallationController {
        &self.controller
    }

    pub fn app_updater(&self) -> &AppUpdateController {
        &self.app_updater
    }

    /// Locate the game, read what is installed and fetch the catalog.
    pub async fn bootstrap(&self) -> Option<GameInstallation> {
        info!("bootstrap: resolving game directory");
        if let Err(err) = self.controller.begin_resolving() {
            warn!("bootstrap: {err}");
            return self.resolver.installation();
        }
        let installation = self.resolver.resolve().await;
        self.controller.end_resolving();

        if let Some(installation) = &installation {
            self.load_installed(installation).await;
        }
        if let Err(err) = self.catalog.fetch_catalog().await {
            warn!("bootstrap: {err}");
        }
        installation
    }

    pub fn select_release(&self, version: &str) -> Result<TranslationRelease, InstallerError> {
        let release = self
            .catalog
            .find(version)
            .ok_or_else(|| InstallerError::ReleaseNotFound(version.to_owned()))?;
        *lock(&self.selected) = Some(release.version.clone());
        debug!("selected release {}", release.version);
        Ok(release)
    }

    /// The explicit choice if it is still listed, otherwise the catalog's first release.
    pub fn selected_release(&self) -> Option<TranslationRelease> {
        let chosen = lock(&self.selected).clone();
        chosen
            .and_then(|version| self.catalog.find(&version))
            .or_else(|| self.catalog.default_release())
    }

    pub fn classify_selected(&self) -> Option<InstallAction> {
        let release = self.selected_release()?;
        Some(InstallAction::classify(
            self.controller.installed().as_ref(),
            &release,
        ))
    }

    /// Install, reinstall or update to the selected release, whichever applies.
    pub async fn apply_selected(&self) -> Result<InstallAction, InstallerError> {
        let path = self.game_path()?;
        let release = self
            .selected_release()
            .ok_or_else(|| InstallerError::ReleaseNotFound("no release selected".into()))?;
        let action = InstallAction::classify(self.controller.installed().as_ref(), &release);
        info!("apply: {:?} {}", action, release.version);
        match action {
            InstallAction::Install | InstallAction::Reinstall => {
                self.controller.install(&path, &release).await?
            }
            InstallAction::Update => self.controller.update(&path, &release).await?,
        }
        self.refresh_installation().await;
        Ok(action)
    }

    /// Strict update: fails unless a different version is installed.
    pub async fn update_selected(&self) -> Result<TranslationRelease, InstallerError> {
        let path = self.game_path()?;
        let release = self
            .selected_release()
            .ok_or_else(|| InstallerError::ReleaseNotFound("no release selected".into()))?;
        self.controller.update(&path, &release).await?;
        self.refresh_installation().await;
        Ok(release)
    }

    pub async fn uninstall(&self) -> Result<(), InstallerError> {
        let path = self.game_path()?;
        self.controller.uninstall(&path).await?;
        self.refresh_installation().await;
        Ok(())
    }

    pub async fn handle_action(&self, action: UserAction) -> Result<(), InstallerError> {
        debug!("action: {action:?}");
        match action {
            UserAction::AutoDetect => {
                if let Some(installation) = self.resolver.auto_detect().await {
                    self.load_installed(&installation).await;
                }
            }
            UserAction::SelectGameDirectory => {
                if let Some(installation) = self.resolver.select_manually().await? {
                    self.load_installed(&installation).await;
                }
            }
            UserAction::UseGamePath(path) => {
                let installation = self.resolver.use_path(&path).await?;
                self.load_installed(&installation).await;
            }
            UserAction::RefreshCatalog => {
                self.catalog.fetch_catalog().await?;
            }
            UserAction::SelectRelease(version) => {
                self.select_release(&version)?;
            }
            UserAction::ApplySelected => {
                self.apply_selected().await?;
            }
            UserAction::Uninstall => self.uninstall().await?,
            UserAction::CheckAppUpdate => {
                self.app_updater.check_for_update().await?;
            }
            UserAction::InstallAppUpdate => self.app_updater.download_and_install().await?,
            UserAction::DismissAppUpdate => self.app_updater.dismiss()?,
        }
        Ok(())
    }

    fn game_path(&self) -> Result<PathBuf, InstallerError> {
        self.resolver
            .installation()
            .map(|installation| installation.path)
            .ok_or(InstallerError::PathNotFound)
    }

    async fn load_installed(&self, installation: &GameInstallation) {
        if let Err(err) = self.controller.load_installed(&installation.path).await {
            warn!("bootstrap: could not read installed translation: {err}");
        }
    }

    async fn refresh_installation(&self) {
        if let Err(err) = self.resolver.refresh().await {
            warn!("refresh after operation failed: {err}");
        }
    }
}
