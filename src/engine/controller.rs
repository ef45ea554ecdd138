use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::{error, info, warn};
use tokio::sync::mpsc;

use crate::backend::Backend;
use crate::catalog::CatalogClient;
use crate::engine::models::{InstalledTranslationRecord, OperationProgress, TranslationRelease};
use crate::engine::progress::{ProgressBridge, ProgressTopic, ProgressTracker, drive};
use crate::engine::state::{ControllerState, EngineUpdate, OperationKind};
use crate::error::InstallerError;
use crate::util::lock;

struct ControllerInner {
    state: ControllerState,
    installed: Option<InstalledTranslationRecord>,
    progress: Option<OperationProgress>,
    last_error: Option<String>,
}

/// Runs install, update and uninstall against one game directory, one at a time.
///
/// A request that arrives while another is in flight is rejected with
/// [`InstallerError::OperationBusy`] before anything is dispatched. The installed
/// record only changes after the backend confirmed the operation.
pub struct InstallationController {
    backend: Arc<dyn Backend>,
    bridge: ProgressBridge,
    catalog: Arc<CatalogClient>,
    inner: Mutex<ControllerInner>,
    updates: Option<mpsc::UnboundedSender<EngineUpdate>>,
}

impl InstallationController {
    pub fn new(
        backend: Arc<dyn Backend>,
        bridge: ProgressBridge,
        catalog: Arc<CatalogClient>,
        updates: Option<mpsc::UnboundedSender<EngineUpdate>>,
    ) -> Self {
        Self {
            backend,
            bridge,
            catalog,
            inner: Mutex::new(ControllerInner {
                state: ControllerState::Idle,
                installed: None,
                progress: None,
                last_error: None,
            }),
            updates,
        }
    }

    pub fn state(&self) -> ControllerState {
        lock(&self.inner).state.clone()
    }

    pub fn installed(&self) -> Option<InstalledTranslationRecord> {
        lock(&self.inner).installed.clone()
    }

    pub fn progress(&self) -> Option<OperationProgress> {
        lock(&self.inner).progress.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner).last_error.clone()
    }

    /// Hold the slot while the game directory is being located.
    pub fn begin_resolving(&self) -> Result<(), InstallerError> {
        self.enter(ControllerState::Resolving)
    }

    pub fn end_resolving(&self) {
        let finished = {
            let mut inner = lock(&self.inner);
            let resolving = inner.state == ControllerState::Resolving;
            if resolving {
                inner.state = ControllerState::Idle;
            }
            resolving
        };
        if finished {
            self.publish(EngineUpdate::Translation(ControllerState::Idle));
        }
    }

    /// Replace the cached record with what the backend reports for `path`.
    ///
    /// A failed read clears the cache: the previous record belongs to whatever
    /// directory was loaded before.
    pub async fn load_installed(
        &self,
        path: &Path,
    ) -> Result<Option<InstalledTranslationRecord>, InstallerError> {
        if matches!(self.state(), ControllerState::Busy(_)) {
            return Err(InstallerError::OperationBusy);
        }
        let fetched = self.catalog.fetch_installed_record(path).await;
        lock(&self.inner).installed = fetched.as_ref().ok().cloned().flatten();
        fetched
    }

    /// Install `release`. Reinstalling the version already present is allowed.
    pub async fn install(
        &self,
        path: &Path,
        release: &TranslationRelease,
    ) -> Result<(), InstallerError> {
        let kind = OperationKind::Install;
        self.begin(kind)?;
        info!("install: {} into {}", release.version, path.display());
        let result = async {
            self.revalidate(path).await?;
            self.dispatch(kind, self.backend.install_translation(path, release))
                .await?;
            self.after_apply(path).await;
            Ok::<(), InstallerError>(())
        }
        .await;
        self.finish(kind, result)
    }

    /// Replace the installed translation with a different `release`.
    pub async fn update(
        &self,
        path: &Path,
        release: &TranslationRelease,
    ) -> Result<(), InstallerError> {
        let kind = OperationKind::Update;
        self.begin(kind)?;
        info!("update: {} into {}", release.version, path.display());
        let result = async {
            self.revalidate(path).await?;
            match self.refresh_record(path).await? {
                None => {
                    return Err(InstallerError::UpdateFailed(
                        "no translation is installed".into(),
                    ));
                }
                Some(record) if record.version == release.version => {
                    return Err(InstallerError::UpdateFailed(format!(
                        "version {} is already installed",
                        record.version
                    )));
                }
                Some(_) => {}
            }
            self.dispatch(kind, self.backend.update_translation(path, release))
                .await?;
            self.after_apply(path).await;
            Ok::<(), InstallerError>(())
        }
        .await;
        self.finish(kind, result)
    }

    pub async fn uninstall(&self, path: &Path) -> Result<(), InstallerError> {
        let kind = OperationKind::Uninstall;
        self.begin(kind)?;
        info!("uninstall: {}", path.display());
        let result = async {
            self.revalidate(path).await?;
            if self.refresh_record(path).await?.is_none() {
                return Err(InstallerError::UninstallFailed(
                    "no translation is installed".into(),
                ));
            }
            self.dispatch(kind, self.backend.uninstall_translation(path))
                .await?;
            lock(&self.inner).installed = None;
            Ok::<(), InstallerError>(())
        }
        .await;
        self.finish(kind, result)
    }

    fn begin(&self, kind: OperationKind) -> Result<(), InstallerError> {
        self.enter(ControllerState::Busy(kind))
    }

    fn enter(&self, next: ControllerState) -> Result<(), InstallerError> {
        {
            let mut inner = lock(&self.inner);
            if !inner.state.is_idle() {
                warn!("controller: rejected {:?}, {:?} in progress", next, inner.state);
                return Err(InstallerError::OperationBusy);
            }
            inner.state = next.clone();
            inner.last_error = None;
        }
        self.publish(EngineUpdate::Translation(next));
        Ok(())
    }

    async fn revalidate(&self, path: &Path) -> Result<(), InstallerError> {
        let installation = self
            .backend
            .validate_game_path(path)
            .await
            .map_err(InstallerError::PathInvalid)?;
        if !installation.is_valid {
            return Err(InstallerError::PathInvalid(format!(
                "{} is not a valid game directory",
                path.display()
            )));
        }
        Ok(())
    }

    async fn refresh_record(
        &self,
        path: &Path,
    ) -> Result<Option<InstalledTranslationRecord>, InstallerError> {
        let record = self.catalog.fetch_installed_record(path).await?;
        lock(&self.inner).installed = record.clone();
        Ok(record)
    }

    async fn dispatch(
        &self,
        kind: OperationKind,
        operation: impl Future<Output = Result<(), String>>,
    ) -> Result<(), InstallerError> {
        let subscription = self.bridge.subscribe(ProgressTopic::Translation);
        let mut tracker = ProgressTracker::start(kind.start_message());
        self.set_progress(Some(tracker.current().clone()));
        drive(subscription, operation, |event| {
            let snapshot = tracker.observe(event).clone();
            self.set_progress(Some(snapshot));
        })
        .await
        .map_err(|cause| operation_failed(kind, cause))
    }

    // The operation already succeeded; stale follow-up reads are only logged.
    async fn after_apply(&self, path: &Path) {
        if let Err(err) = self.refresh_record(path).await {
            warn!("controller: record refresh failed: {err}");
        }
        if let Err(err) = self.catalog.fetch_catalog().await {
            warn!("controller: catalog refresh failed: {err}");
        }
    }

    fn finish(
        &self,
        kind: OperationKind,
        result: Result<(), InstallerError>,
    ) -> Result<(), InstallerError> {
        match result {
            Ok(()) => {
                info!("{}: finished", kind.label());
                self.set_progress(Some(OperationProgress::new(kind.done_message(), 100.0)));
                self.settle(ControllerState::Succeeded(kind));
                Ok(())
            }
            Err(err) => {
                error!("{}: {err}", kind.label());
                self.set_progress(None);
                let reason = err.to_string();
                lock(&self.inner).last_error = Some(reason.clone());
                self.settle(ControllerState::Failed { kind, reason });
                Err(err)
            }
        }
    }

    fn settle(&self, terminal: ControllerState) {
        lock(&self.inner).state = terminal.clone();
        self.publish(EngineUpdate::Translation(terminal));
        lock(&self.inner).state = ControllerState::Idle;
        self.publish(EngineUpdate::Translation(ControllerState::Idle));
    }

    fn set_progress(&self, progress: Option<OperationProgress>) {
        lock(&self.inner).progress = progress.clone();
        if let Some(progress) = progress {
            self.publish(EngineUpdate::TranslationProgress(progress));
        }
    }

    fn publish(&self, update: EngineUpdate) {
        if let Some(updates) = &self.updates {
            let _ = updates.send(update);
        }
    }
}

fn operation_failed(kind: OperationKind, cause: String) -> InstallerError {
    match kind {
        OperationKind::Install => InstallerError::InstallFailed(cause),
        OperationKind::Update => InstallerError::UpdateFailed(cause),
        OperationKind::Uninstall => InstallerError::UninstallFailed(cause),
    }
}
