use std::path::Path;
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::backend::Backend;
use crate::engine::models::{InstalledTranslationRecord, TranslationCatalog, TranslationRelease};
use crate::error::InstallerError;
use crate::util::lock;

struct CatalogState {
    catalog: Option<TranslationCatalog>,
    last_error: Option<InstallerError>,
}

/// Read-only view of published releases and of what is installed.
///
/// A failed fetch keeps the last good catalog around and flags it as stale.
pub struct CatalogClient {
    backend: Arc<dyn Backend>,
    state: Mutex<CatalogState>,
}

impl CatalogClient {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: Mutex::new(CatalogState {
                catalog: None,
                last_error: None,
            }),
        }
    }

    pub async fn fetch_catalog(&self) -> Result<TranslationCatalog, InstallerError> {
        match self.backend.get_available_translations().await {
            Ok(catalog) => {
                info!(
                    "catalog: {} releases from {}",
                    catalog.releases.len(),
                    catalog.source_repository
                );
                let mut state = lock(&self.state);
                state.catalog = Some(catalog.clone());
                state.last_error = None;
                Ok(catalog)
            }
            Err(cause) => {
                warn!("catalog: fetch failed: {cause}");
                let err = InstallerError::CatalogFetchFailed(cause);
                lock(&self.state).last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Last catalog that was fetched successfully.
    pub fn catalog(&self) -> Option<TranslationCatalog> {
        lock(&self.state).catalog.clone()
    }

    pub fn is_stale(&self) -> bool {
        let state = lock(&self.state);
        state.catalog.is_some() && state.last_error.is_some()
    }

    pub fn last_error(&self) -> Option<InstallerError> {
        lock(&self.state).last_error.clone()
    }

    /// First release in server order, once a catalog has been fetched.
    pub fn default_release(&self) -> Option<TranslationRelease> {
        lock(&self.state)
            .catalog
            .as_ref()
            .and_then(TranslationCatalog::default_release)
            .cloned()
    }

    pub fn find(&self, version: &str) -> Option<TranslationRelease> {
        lock(&self.state)
            .catalog
            .as_ref()
            .and_then(|catalog| catalog.find(version))
            .cloned()
    }

    pub async fn fetch_installed_record(
        &self,
        path: &Path,
    ) -> Result<Option<InstalledTranslationRecord>, InstallerError> {
        self.backend
            .get_translation_info(path)
            .await
            .map_err(InstallerError::CatalogFetchFailed)
    }

    /// Newest release when it differs from `current_version`.
    pub async fn check_for_update(
        &self,
        current_version: &str,
    ) -> Result<Option<TranslationRelease>, InstallerError> {
        self.backend
            .check_translation_updates(current_version)
            .await
            .map_err(InstallerError::CatalogFetchFailed)
    }
}
