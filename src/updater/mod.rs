use std::sync::{Arc, Mutex};

use log::{error, info, warn};
use tokio::sync::mpsc;

use crate::backend::Backend;
use crate::engine::models::{AppUpdateInfo, OperationProgress};
use crate::engine::progress::{ProgressBridge, ProgressTopic, ProgressTracker, drive};
use crate::engine::state::{AppUpdateState, EngineUpdate};
use crate::error::InstallerError;
use crate::util::lock;

struct UpdaterInner {
    state: AppUpdateState,
    pending: Option<AppUpdateInfo>,
    progress: Option<OperationProgress>,
    last_error: Option<String>,
}

/// Checks for and applies new versions of the installer itself.
///
/// Holds a single operation slot of its own, independent of the translation controller.
pub struct AppUpdateController {
    backend: Arc<dyn Backend>,
    bridge: ProgressBridge,
    inner: Mutex<UpdaterInner>,
    updates: Option<mpsc::UnboundedSender<EngineUpdate>>,
}

impl AppUpdateController {
    pub fn new(
        backend: Arc<dyn Backend>,
        bridge: ProgressBridge,
        updates: Option<mpsc::UnboundedSender<EngineUpdate>>,
    ) -> Self {
        Self {
            backend,
            bridge,
            inner: Mutex::new(UpdaterInner {
                state: AppUpdateState::Idle,
                pending: None,
                progress: None,
                last_error: None,
            }),
            updates,
        }
    }

    pub fn state(&self) -> AppUpdateState {
        lock(&self.inner).state.clone()
    }

    pub fn pending(&self) -> Option<AppUpdateInfo> {
        lock(&self.inner).pending.clone()
    }

    pub fn progress(&self) -> Option<OperationProgress> {
        lock(&self.inner).progress.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner).last_error.clone()
    }

    pub async fn check_for_update(&self) -> Result<Option<AppUpdateInfo>, InstallerError> {
        self.begin(AppUpdateState::Checking)?;
        info!("app update: checking for a newer installer");
        match self.backend.check_app_update().await {
            Ok(found) => {
                match &found {
                    Some(info) => info!(
                        "app update: {} available (running {})",
                        info.version, info.current_version
                    ),
                    None => info!("app update: installer is up to date"),
                }
                lock(&self.inner).pending = found.clone();
                self.settle(AppUpdateState::Succeeded);
                Ok(found)
            }
            Err(cause) => {
                warn!("app update: check failed: {cause}");
                let err = InstallerError::AppUpdateCheckFailed(cause);
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Download and launch the pending installer. Completion is the backend call's
    /// result; `updater-progress` events only move the displayed percentage.
    pub async fn download_and_install(&self) -> Result<(), InstallerError> {
        let info = {
            let mut inner = lock(&self.inner);
            if !inner.state.is_idle() {
                warn!("app update: rejected, {:?} in progress", inner.state);
                return Err(InstallerError::OperationBusy);
            }
            let Some(info) = inner.pending.clone() else {
                return Err(InstallerError::AppUpdateDownloadFailed(
                    "no update is pending".into(),
                ));
            };
            inner.state = AppUpdateState::Downloading;
            inner.last_error = None;
            info
        };
        self.publish(EngineUpdate::AppUpdate(AppUpdateState::Downloading));
        info!("app update: downloading {}", info.version);

        let subscription = self.bridge.subscribe(ProgressTopic::Updater);
        let mut tracker = ProgressTracker::start("Preparing...");
        self.set_progress(Some(tracker.current().clone()));
        let result = drive(
            subscription,
            self.backend.download_and_install_update(&info),
            |event| {
                let snapshot = tracker.observe(event).clone();
                self.set_progress(Some(snapshot));
            },
        )
        .await;

        match result {
            Ok(()) => {
                info!("app update: installer for {} launched", info.version);
                self.set_progress(Some(OperationProgress::new("Download complete", 100.0)));
                lock(&self.inner).pending = None;
                self.settle(AppUpdateState::Succeeded);
                Ok(())
            }
            Err(cause) => {
                error!("app update: download failed: {cause}");
                self.set_progress(None);
                let err = InstallerError::AppUpdateDownloadFailed(cause);
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Forget the pending update; nothing on disk is touched.
    pub fn dismiss(&self) -> Result<(), InstallerError> {
        let mut inner = lock(&self.inner);
        if !inner.state.is_idle() {
            return Err(InstallerError::OperationBusy);
        }
        inner.pending = None;
        inner.last_error = None;
        Ok(())
    }

    fn begin(&self, next: AppUpdateState) -> Result<(), InstallerError> {
        {
            let mut inner = lock(&self.inner);
            if !inner.state.is_idle() {
                warn!("app update: rejected, {:?} in progress", inner.state);
                return Err(InstallerError::OperationBusy);
            }
            inner.state = next.clone();
            inner.last_error = None;
        }
        self.publish(EngineUpdate::AppUpdate(next));
        Ok(())
    }

    fn fail(&self, err: &InstallerError) {
        let reason = err.to_string();
        lock(&self.inner).last_error = Some(reason.clone());
        self.settle(AppUpdateState::Failed(reason));
    }

    // Publish the terminal state, then fall back to Idle.
    fn settle(&self, terminal: AppUpdateState) {
        lock(&self.inner).state = terminal.clone();
        self.publish(EngineUpdate::AppUpdate(terminal));
        lock(&self.inner).state = AppUpdateState::Idle;
        self.publish(EngineUpdate::AppUpdate(AppUpdateState::Idle));
    }

    fn set_progress(&self, progress: Option<OperationProgress>) {
        lock(&self.inner).progress = progress.clone();
        if let Some(progress) = progress {
            self.publish(EngineUpdate::AppUpdateProgress(progress));
        }
    }

    fn publish(&self, update: EngineUpdate) {
        if let Some(updates) = &self.updates {
            let _ = updates.send(update);
        }
    }
}

/// Whether release tag `candidate` is newer than `current` (both may carry a `v` prefix).
pub fn is_newer_version(candidate: &str, current: &str) -> bool {
    version_key(candidate) > version_key(current)
}

/// Numeric components of a release tag, trailing zeros dropped so `0.1` equals `0.1.0`.
fn version_key(tag: &str) -> Vec<u32> {
    let mut key: Vec<u32> = tag
        .trim()
        .trim_start_matches(['v', 'V'])
        .split('.')
        .filter_map(|part| part.parse().ok())
        .collect();
    while key.last() == Some(&0) {
        key.pop();
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, app_update_info, drain};

    fn controller(
        fake: &Arc<FakeBackend>,
    ) -> (AppUpdateController, mpsc::UnboundedReceiver<EngineUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend: Arc<dyn Backend> = fake.clone();
        (
            AppUpdateController::new(backend, fake.bridge(), Some(tx)),
            rx,
        )
    }

    #[test]
    fn version_keys_ignore_prefix_and_trailing_zeros() {
        assert_eq!(version_key("  v1.2.3 "), vec![1, 2, 3]);
        assert_eq!(version_key("0.1"), version_key("0.1.0"));
        assert_eq!(version_key("V2.0.0"), vec![2]);
    }

    #[test]
    fn newer_versions_compare_numerically() {
        assert!(is_newer_version("0.1.6", "0.1.5"));
        assert!(is_newer_version("1.0.0", "0.9.9"));
        assert!(is_newer_version("v0.10.0", "0.9.1"));
        assert!(!is_newer_version("0.1.4", "0.1.5"));
        assert!(!is_newer_version("v0.3.0", "0.3.0"));
        assert!(!is_newer_version("0.3", "0.3.0"));
    }

    #[tokio::test]
    async fn check_stores_pending_update_and_dismiss_discards_it() {
        let fake = FakeBackend::new();
        fake.set_app_update(Some(app_update_info("0.4.0")));
        let (updater, _rx) = controller(&fake);

        let found = updater.check_for_update().await.unwrap();
        assert_eq!(found.map(|info| info.version), Some("0.4.0".to_string()));
        assert!(updater.pending().is_some());
        assert_eq!(updater.state(), AppUpdateState::Idle);

        updater.dismiss().unwrap();
        assert!(updater.pending().is_none());
        assert!(fake.calls().iter().all(|call| call != "download_and_install_update"));
    }

    #[tokio::test]
    async fn failed_check_is_reported_and_returns_to_idle() {
        let fake = FakeBackend::new();
        fake.fail_app_update_check("rate limited");
        let (updater, mut rx) = controller(&fake);

        let err = updater.check_for_update().await.unwrap_err();
        assert_eq!(err, InstallerError::AppUpdateCheckFailed("rate limited".into()));
        assert_eq!(updater.state(), AppUpdateState::Idle);
        let states: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|update| match update {
                EngineUpdate::AppUpdate(state) => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                AppUpdateState::Checking,
                AppUpdateState::Failed(err.to_string()),
                AppUpdateState::Idle,
            ]
        );
    }

    #[tokio::test]
    async fn download_without_pending_update_is_rejected() {
        let fake = FakeBackend::new();
        let (updater, _rx) = controller(&fake);
        assert!(matches!(
            updater.download_and_install().await,
            Err(InstallerError::AppUpdateDownloadFailed(_))
        ));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn second_request_while_downloading_is_busy() {
        let fake = FakeBackend::new();
        fake.set_app_update(Some(app_update_info("0.4.0")));
        let gate = fake.hold_operations();
        let (updater, _rx) = controller(&fake);
        updater.check_for_update().await.unwrap();

        let (first, second) = tokio::join!(updater.download_and_install(), async {
            let busy_check = updater.check_for_update().await;
            let busy_dismiss = updater.dismiss();
            gate.notify_one();
            (busy_check, busy_dismiss)
        });

        assert_eq!(first, Ok(()));
        assert_eq!(second.0, Err(InstallerError::OperationBusy));
        assert_eq!(second.1, Err(InstallerError::OperationBusy));
        assert!(updater.pending().is_none());
        assert_eq!(updater.progress().map(|p| p.percent), Some(100.0));
        assert_eq!(fake.bridge().subscriber_count(ProgressTopic::Updater), 0);
    }

    #[tokio::test]
    async fn download_during_check_is_busy() {
        let fake = FakeBackend::new();
        fake.set_app_update(Some(app_update_info("0.4.0")));
        let gate = fake.hold_app_update_checks();
        let (updater, _rx) = controller(&fake);

        let (checked, download) = tokio::join!(updater.check_for_update(), async {
            let download = updater.download_and_install().await;
            assert_eq!(updater.state(), AppUpdateState::Checking);
            gate.notify_one();
            download
        });

        assert_eq!(download, Err(InstallerError::OperationBusy));
        assert_eq!(checked.unwrap().map(|info| info.version), Some("0.4.0".into()));
        assert!(updater.last_error().is_none());
        assert!(fake.calls().iter().all(|call| call != "download_and_install_update"));
    }

    #[tokio::test]
    async fn failed_download_keeps_update_pending_for_retry() {
        let fake = FakeBackend::new();
        fake.set_app_update(Some(app_update_info("0.4.0")));
        fake.fail_next("download_and_install_update", "checksum mismatch");
        let (updater, _rx) = controller(&fake);
        updater.check_for_update().await.unwrap();

        let err = updater.download_and_install().await.unwrap_err();
        assert_eq!(
            err,
            InstallerError::AppUpdateDownloadFailed("checksum mismatch".into())
        );
        assert!(updater.pending().is_some());
        assert!(updater.progress().is_none());
        assert_eq!(updater.state(), AppUpdateState::Idle);
    }
}
