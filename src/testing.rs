//! Scriptable doubles for the backend and the config store.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{Notify, mpsc};

use crate::backend::Backend;
use crate::engine::models::{
    AppConfiguration, AppUpdateInfo, GameInstallation, InstalledTranslationRecord,
    TranslationCatalog, TranslationRelease,
};
use crate::engine::progress::{ProgressBridge, ProgressEmitter, ProgressTopic};
use crate::engine::state::EngineUpdate;
use crate::storage::ConfigStore;
use crate::util::lock;

pub fn release(version: &str) -> TranslationRelease {
    TranslationRelease {
        version: version.into(),
        release_date: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        download_url: format!("https://example.invalid/PriconneTL_{version}.zip"),
        file_size_bytes: 4096,
        changelog: vec![format!("Release {version}")],
        download_count: 0,
    }
}

pub fn catalog(versions: &[&str]) -> TranslationCatalog {
    TranslationCatalog {
        latest_version: versions.last().copied().unwrap_or_default().into(),
        releases: versions.iter().map(|version| release(version)).collect(),
        source_repository: "owner/repo".into(),
    }
}

pub fn record(version: &str) -> InstalledTranslationRecord {
    InstalledTranslationRecord {
        version: version.into(),
        installed_date: Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap(),
        files: vec!["BepInEx".into(), "dxgi.dll".into()],
    }
}

pub fn app_update_info(version: &str) -> AppUpdateInfo {
    AppUpdateInfo {
        version: version.into(),
        current_version: "0.3.0".into(),
        release_date: Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap(),
        download_url: format!("https://example.invalid/priconevh_{version}.msi"),
        file_size_bytes: 8192,
        changelog: Vec::new(),
    }
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<EngineUpdate>) -> Vec<EngineUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

struct FakeState {
    calls: Vec<String>,
    valid_paths: HashSet<PathBuf>,
    detected: Option<PathBuf>,
    picked: Option<PathBuf>,
    catalog: Result<TranslationCatalog, String>,
    records: HashMap<PathBuf, InstalledTranslationRecord>,
    failures: HashMap<String, String>,
    app_update: Result<Option<AppUpdateInfo>, String>,
    script: Vec<(String, f32)>,
}

/// In-memory backend. Mutating calls replay the progress script, then wait on the
/// gate (when held) before applying their effect.
pub struct FakeBackend {
    bridge: ProgressBridge,
    translation: ProgressEmitter,
    updater: ProgressEmitter,
    gate: Mutex<Option<Arc<Notify>>>,
    check_gate: Mutex<Option<Arc<Notify>>>,
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let bridge = ProgressBridge::new();
        Arc::new(Self {
            translation: bridge.emitter(ProgressTopic::Translation),
            updater: bridge.emitter(ProgressTopic::Updater),
            bridge,
            gate: Mutex::new(None),
            check_gate: Mutex::new(None),
            state: Mutex::new(FakeState {
                calls: Vec::new(),
                valid_paths: HashSet::new(),
                detected: None,
                picked: None,
                catalog: Ok(catalog(&[])),
                records: HashMap::new(),
                failures: HashMap::new(),
                app_update: Ok(None),
                script: vec![
                    ("Downloading...".into(), 20.0),
                    ("Extracting...".into(), 50.0),
                    ("Done!".into(), 100.0),
                ],
            }),
        })
    }

    pub fn bridge(&self) -> ProgressBridge {
        self.bridge.clone()
    }

    pub fn add_game(&self, path: impl Into<PathBuf>) {
        lock(&self.state).valid_paths.insert(path.into());
    }

    pub fn remove_game(&self, path: &Path) {
        lock(&self.state).valid_paths.remove(path);
    }

    pub fn set_detected(&self, path: Option<PathBuf>) {
        lock(&self.state).detected = path;
    }

    pub fn set_picked(&self, path: Option<PathBuf>) {
        lock(&self.state).picked = path;
    }

    pub fn set_catalog(&self, catalog: TranslationCatalog) {
        lock(&self.state).catalog = Ok(catalog);
    }

    pub fn fail_catalog(&self, cause: &str) {
        lock(&self.state).catalog = Err(cause.into());
    }

    pub fn set_record(&self, path: impl Into<PathBuf>, record: InstalledTranslationRecord) {
        lock(&self.state).records.insert(path.into(), record);
    }

    pub fn record_at(&self, path: &Path) -> Option<InstalledTranslationRecord> {
        lock(&self.state).records.get(path).cloned()
    }

    pub fn set_progress_script(&self, script: &[(&str, f32)]) {
        lock(&self.state).script = script
            .iter()
            .map(|(message, percent)| ((*message).to_owned(), *percent))
            .collect();
    }

    pub fn set_app_update(&self, info: Option<AppUpdateInfo>) {
        lock(&self.state).app_update = Ok(info);
    }

    pub fn fail_app_update_check(&self, cause: &str) {
        lock(&self.state).app_update = Err(cause.into());
    }

    /// The next call to `op` fails with `cause`.
    pub fn fail_next(&self, op: &str, cause: &str) {
        lock(&self.state).failures.insert(op.into(), cause.into());
    }

    /// Mutating calls block until the returned gate is notified once per call.
    pub fn hold_operations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.gate) = Some(gate.clone());
        gate
    }

    /// App update checks block until the returned gate is notified.
    pub fn hold_app_update_checks(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.check_gate) = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    fn enter(&self, op: &str) -> Result<(), String> {
        let mut state = lock(&self.state);
        state.calls.push(op.to_owned());
        match state.failures.remove(op) {
            Some(cause) => Err(cause),
            None => Ok(()),
        }
    }

    fn installation(&self, path: &Path) -> Result<GameInstallation, String> {
        let state = lock(&self.state);
        if !state.valid_paths.contains(path) {
            return Err(format!("{} is not a game directory", path.display()));
        }
        let record = state.records.get(path);
        Ok(GameInstallation {
            path: path.to_path_buf(),
            version: Some("6.2.0".into()),
            is_valid: true,
            has_translation: record.is_some(),
            translation_version: record.map(|record| record.version.clone()),
        })
    }

    // Replay the script, wait for the gate, then decide the outcome.
    async fn run_mutation(&self, op: &str, emitter: &ProgressEmitter) -> Result<(), String> {
        let script = lock(&self.state).script.clone();
        for (message, percent) in script {
            emitter.emit(message, percent);
            tokio::task::yield_now().await;
        }
        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.enter(op)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn auto_detect_game(&self) -> Result<Option<PathBuf>, String> {
        self.enter("auto_detect_game")?;
        Ok(lock(&self.state).detected.clone())
    }

    async fn select_game_directory(&self) -> Result<Option<PathBuf>, String> {
        self.enter("select_game_directory")?;
        Ok(lock(&self.state).picked.clone())
    }

    async fn validate_game_path(&self, path: &Path) -> Result<GameInstallation, String> {
        self.enter("validate_game_path")?;
        self.installation(path)
    }

    async fn get_game_info(&self, path: &Path) -> Result<GameInstallation, String> {
        self.enter("get_game_info")?;
        self.installation(path)
    }

    async fn get_available_translations(&self) -> Result<TranslationCatalog, String> {
        self.enter("get_available_translations")?;
        lock(&self.state).catalog.clone()
    }

    async fn check_translation_updates(
        &self,
        current_version: &str,
    ) -> Result<Option<TranslationRelease>, String> {
        self.enter("check_translation_updates")?;
        let catalog = lock(&self.state).catalog.clone()?;
        Ok(catalog
            .default_release()
            .filter(|release| release.version != current_version)
            .cloned())
    }

    async fn install_translation(
        &self,
        path: &Path,
        release: &TranslationRelease,
    ) -> Result<(), String> {
        self.run_mutation("install_translation", &self.translation)
            .await?;
        self.set_record(path, record(&release.version));
        Ok(())
    }

    async fn update_translation(
        &self,
        path: &Path,
        release: &TranslationRelease,
    ) -> Result<(), String> {
        self.run_mutation("update_translation", &self.translation)
            .await?;
        self.set_record(path, record(&release.version));
        Ok(())
    }

    async fn uninstall_translation(&self, path: &Path) -> Result<(), String> {
        self.run_mutation("uninstall_translation", &self.translation)
            .await?;
        lock(&self.state).records.remove(path);
        Ok(())
    }

    async fn get_translation_info(
        &self,
        path: &Path,
    ) -> Result<Option<InstalledTranslationRecord>, String> {
        self.enter("get_translation_info")?;
        Ok(self.record_at(path))
    }

    async fn check_app_update(&self) -> Result<Option<AppUpdateInfo>, String> {
        let gate = lock(&self.check_gate).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.enter("check_app_update")?;
        lock(&self.state).app_update.clone()
    }

    async fn download_and_install_update(&self, _info: &AppUpdateInfo) -> Result<(), String> {
        self.run_mutation("download_and_install_update", &self.updater)
            .await
    }
}

/// Config store that keeps every saved value for inspection.
#[derive(Clone)]
pub struct MemoryConfigStore {
    inner: Arc<Mutex<MemoryConfigState>>,
}

struct MemoryConfigState {
    stored: Result<AppConfiguration, String>,
    saved: Vec<AppConfiguration>,
    save_error: Option<String>,
}

impl MemoryConfigStore {
    pub fn new(config: AppConfiguration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryConfigState {
                stored: Ok(config),
                saved: Vec::new(),
                save_error: None,
            })),
        }
    }

    pub fn failing_load(cause: &str) -> Self {
        let store = Self::new(AppConfiguration::default());
        lock(&store.inner).stored = Err(cause.into());
        store
    }

    pub fn fail_saves(&self, cause: &str) {
        lock(&self.inner).save_error = Some(cause.into());
    }

    pub fn saved(&self) -> Vec<AppConfiguration> {
        lock(&self.inner).saved.clone()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<AppConfiguration, String> {
        lock(&self.inner).stored.clone()
    }

    async fn save(&self, config: &AppConfiguration) -> Result<(), String> {
        let mut inner = lock(&self.inner);
        if let Some(cause) = &inner.save_error {
            return Err(cause.clone());
        }
        inner.stored = Ok(config.clone());
        inner.saved.push(config.clone());
        Ok(())
    }
}
