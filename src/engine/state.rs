use std::path::PathBuf;

use crate::engine::models::{InstalledTranslationRecord, OperationProgress, TranslationRelease};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Install,
    Update,
    Uninstall,
}

impl OperationKind {
    pub const fn label(self) -> &'static str {
        match self {
            OperationKind::Install => "install",
            OperationKind::Update => "update",
            OperationKind::Uninstall => "uninstall",
        }
    }

    pub const fn start_message(self) -> &'static str {
        match self {
            OperationKind::Install => "Preparing...",
            OperationKind::Update => "Updating...",
            OperationKind::Uninstall => "Removing translation...",
        }
    }

    pub const fn done_message(self) -> &'static str {
        match self {
            OperationKind::Install => "Installation complete",
            OperationKind::Update => "Update complete",
            OperationKind::Uninstall => "Translation removed",
        }
    }
}

// Single tagged state so "installing" and "uninstalling" can never both hold.
#[derive(Clone, Debug, PartialEq)]
pub enum ControllerState {
    Idle,
    Resolving,
    Busy(OperationKind),
    Succeeded(OperationKind),
    Failed {
        kind: OperationKind,
        reason: String,
    },
}

impl ControllerState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ControllerState::Idle)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AppUpdateState {
    Idle,
    Checking,
    Downloading,
    Succeeded,
    Failed(String),
}

impl AppUpdateState {
    pub fn is_idle(&self) -> bool {
        matches!(self, AppUpdateState::Idle)
    }
}

/// What applying a selected release would do to the current installation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallAction {
    Install,
    Reinstall,
    Update,
}

impl InstallAction {
    pub fn classify(
        installed: Option<&InstalledTranslationRecord>,
        selected: &TranslationRelease,
    ) -> Self {
        match installed {
            None => InstallAction::Install,
            Some(record) if record.version == selected.version => InstallAction::Reinstall,
            Some(_) => InstallAction::Update,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    AutoDetect,
    SelectGameDirectory,
    UseGamePath(PathBuf),
    RefreshCatalog,
    SelectRelease(String),
    ApplySelected,
    Uninstall,
    CheckAppUpdate,
    InstallAppUpdate,
    DismissAppUpdate,
}

// Pushed to the presentation layer as things change.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineUpdate {
    Translation(ControllerState),
    TranslationProgress(OperationProgress),
    AppUpdate(AppUpdateState),
    AppUpdateProgress(OperationProgress),
}
