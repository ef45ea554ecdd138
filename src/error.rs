use thiserror::Error;

/// Failures surfaced by the orchestration layer.
///
/// Backend causes are carried verbatim so they can be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstallerError {
    #[error("game directory not found, please select it manually")]
    PathNotFound,
    #[error("invalid game directory: {0}")]
    PathInvalid(String),
    #[error("failed to fetch translation catalog: {0}")]
    CatalogFetchFailed(String),
    #[error("another operation is already in progress")]
    OperationBusy,
    #[error("install failed: {0}")]
    InstallFailed(String),
    #[error("update failed: {0}")]
    UpdateFailed(String),
    #[error("uninstall failed: {0}")]
    UninstallFailed(String),
    #[error("failed to load config: {0}")]
    ConfigLoadFailed(String),
    #[error("failed to save config: {0}")]
    ConfigSaveFailed(String),
    #[error("failed to check for app updates: {0}")]
    AppUpdateCheckFailed(String),
    #[error("failed to download app update: {0}")]
    AppUpdateDownloadFailed(String),
    #[error("release {0} is not in the catalog")]
    ReleaseNotFound(String),
}

impl InstallerError {
    /// Failures of the path resolution step are recoverable by picking another directory.
    #[must_use]
    pub fn is_path_error(&self) -> bool {
        matches!(self, Self::PathNotFound | Self::PathInvalid(_))
    }
}
