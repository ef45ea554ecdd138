use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::engine::models::{AppUpdateInfo, TranslationCatalog, TranslationRelease};
use crate::networking::build_client;
use crate::updater::is_newer_version;

const GITHUB_API: &str = "https://api.github.com/repos";
const TRANSLATION_ASSET_TAG: &str = "PriconneTL";

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAsset {
    pub name: String,
    pub size: u64,
    pub browser_download_url: String,
    #[serde(default)]
    pub download_count: u64,
}

pub struct GitHubClient {
    client: Client,
    repo: String,
}

impl GitHubClient {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            client: build_client(Some(Duration::from_secs(30))),
            repo: repo.into(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, String> {
        debug!("github: GET {url}");
        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| format!("failed to reach GitHub: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("GitHub API returned status: {}", response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| format!("failed to parse release data: {e}"))
    }

    pub async fn latest_release(&self) -> Result<GitHubRelease, String> {
        self.get(&format!("{GITHUB_API}/{}/releases/latest", self.repo))
            .await
    }

    pub async fn all_releases(&self) -> Result<Vec<GitHubRelease>, String> {
        self.get(&format!("{GITHUB_API}/{}/releases", self.repo))
            .await
    }

    pub async fn translation_catalog(&self) -> Result<TranslationCatalog, String> {
        let releases = self.all_releases().await?;
        Ok(catalog_from_releases(&self.repo, releases))
    }

    /// Latest release, when its tag differs from `current_version`.
    pub async fn translation_update(
        &self,
        current_version: &str,
    ) -> Result<Option<TranslationRelease>, String> {
        let latest = self.latest_release().await?;
        if latest.tag_name == current_version {
            return Ok(None);
        }
        translation_release(latest)
            .map(Some)
            .ok_or_else(|| "no translation asset found in the latest release".to_string())
    }

    pub async fn app_update(&self, current_version: &str) -> Result<Option<AppUpdateInfo>, String> {
        let latest = self.latest_release().await?;
        app_update_from_release(latest, current_version)
    }
}

fn changelog(body: Option<&str>) -> Vec<String> {
    body.unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

fn translation_release(release: GitHubRelease) -> Option<TranslationRelease> {
    let asset = release
        .assets
        .iter()
        .find(|asset| asset.name.ends_with(".zip") && asset.name.contains(TRANSLATION_ASSET_TAG))?;
    Some(TranslationRelease {
        changelog: changelog(release.body.as_deref()),
        download_url: asset.browser_download_url.clone(),
        file_size_bytes: asset.size,
        download_count: asset.download_count,
        release_date: release.published_at,
        version: release.tag_name,
    })
}

/// Keeps GitHub's order; releases without a translation archive are skipped.
pub fn catalog_from_releases(repo: &str, releases: Vec<GitHubRelease>) -> TranslationCatalog {
    let latest_version = releases
        .first()
        .map(|release| release.tag_name.clone())
        .unwrap_or_default();
    TranslationCatalog {
        latest_version,
        releases: releases.into_iter().filter_map(translation_release).collect(),
        source_repository: repo.to_owned(),
    }
}

pub fn app_update_from_release(
    release: GitHubRelease,
    current_version: &str,
) -> Result<Option<AppUpdateInfo>, String> {
    if !is_newer_version(&release.tag_name, current_version) {
        return Ok(None);
    }
    let asset = release
        .assets
        .iter()
        .find(|asset| {
            let name = asset.name.to_lowercase();
            name.ends_with(".msi") || name.ends_with(".exe")
        })
        .ok_or_else(|| "no installer found in release".to_string())?;
    Ok(Some(AppUpdateInfo {
        current_version: current_version.to_owned(),
        release_date: release.published_at,
        download_url: asset.browser_download_url.clone(),
        file_size_bytes: asset.size,
        changelog: changelog(release.body.as_deref()),
        version: release.tag_name,
    }))
}
