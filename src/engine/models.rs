use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resolved game directory together with what the backend found inside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInstallation {
    pub path: PathBuf,
    pub version: Option<String>,
    pub is_valid: bool,
    pub has_translation: bool,
    pub translation_version: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRelease {
    /// Opaque identifier; never compared as a semantic version.
    pub version: String,
    pub release_date: DateTime<Utc>,
    pub download_url: String,
    #[serde(rename = "file_size")]
    pub file_size_bytes: u64,
    pub changelog: Vec<String>,
    #[serde(default)]
    pub download_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationCatalog {
    pub latest_version: String,
    /// Server order is authoritative; the first entry is the default selection.
    #[serde(rename = "versions")]
    pub releases: Vec<TranslationRelease>,
    #[serde(rename = "github_repo")]
    pub source_repository: String,
}

impl TranslationCatalog {
    #[must_use]
    pub fn default_release(&self) -> Option<&TranslationRelease> {
        self.releases.first()
    }

    /// First release carrying `version`; duplicates further down are ignored.
    #[must_use]
    pub fn find(&self, version: &str) -> Option<&TranslationRelease> {
        self.releases.iter().find(|release| release.version == version)
    }
}

/// Contents of the marker the backend writes next to the game files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledTranslationRecord {
    pub version: String,
    pub installed_date: DateTime<Utc>,
    pub files: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationProgress {
    pub message: String,
    pub percent: f32,
}

impl OperationProgress {
    pub fn new(message: impl Into<String>, percent: f32) -> Self {
        Self {
            message: message.into(),
            percent,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUpdateInfo {
    pub version: String,
    pub current_version: String,
    pub release_date: DateTime<Utc>,
    pub download_url: String,
    #[serde(rename = "file_size")]
    pub file_size_bytes: u64,
    pub changelog: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Vi,
    En,
    Ja,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Vi, Language::En, Language::Ja];

    pub const fn code(self) -> &'static str {
        match self {
            Language::Vi => "vi",
            Language::En => "en",
            Language::Ja => "ja",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|language| language.code().eq_ignore_ascii_case(code.trim()))
    }
}

pub const DEFAULT_SOURCE_REPOSITORY: &str = "TomiWixoss/priconevh";

/// Process-wide settings; always persisted as a whole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfiguration {
    pub game_path: Option<PathBuf>,
    pub auto_update: bool,
    #[serde(rename = "auto_start")]
    pub auto_start_with_os: bool,
    #[serde(rename = "github_repo")]
    pub source_repository: String,
    pub check_update_on_startup: bool,
    pub language: Language,
}

impl Default for AppConfiguration {
    fn default() -> Self {
        Self {
            game_path: None,
            auto_update: true,
            auto_start_with_os: false,
            source_repository: DEFAULT_SOURCE_REPOSITORY.to_owned(),
            check_update_on_startup: true,
            language: Language::Vi,
        }
    }
}
