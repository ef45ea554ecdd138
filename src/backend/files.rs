use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};
use sysinfo::Disks;
use walkdir::WalkDir;
use zip::read::ZipArchive;

use crate::engine::models::{GameInstallation, InstalledTranslationRecord};

pub const REQUIRED_GAME_FILES: [&str; 2] = ["PrincessConnectReDive.exe", "UnityPlayer.dll"];
pub const TRANSLATION_MARKER: &str = "translation_info.json";
const VERSION_FILE: &str = "version.txt";
const BACKUP_DIR: &str = "translation_backup";
const TRANSLATION_DIRS: [&str; 2] = ["BepInEx", "dotnet"];
const TRANSLATION_FILES: [&str; 3] = [".doorstop_version", "doorstop_config.ini", "dxgi.dll"];

pub fn missing_game_files(game_dir: &Path) -> Vec<&'static str> {
    REQUIRED_GAME_FILES
        .into_iter()
        .filter(|file| !game_dir.join(file).exists())
        .collect()
}

/// Validate `game_dir` and describe what is installed in it.
///
/// `has_translation` and `translation_version` both come from the same marker read,
/// so they can never disagree with `read_marker`.
pub fn inspect_game_dir(game_dir: &Path, with_version: bool) -> Result<GameInstallation, String> {
    if !game_dir.is_dir() {
        return Err(format!("{} is not a directory", game_dir.display()));
    }
    let missing = missing_game_files(game_dir);
    if !missing.is_empty() {
        return Err(format!(
            "not a Princess Connect! Re:Dive directory, missing files: {}",
            missing.join(", ")
        ));
    }

    let record = read_marker(game_dir);
    Ok(GameInstallation {
        path: game_dir.to_path_buf(),
        version: if with_version {
            read_game_version(game_dir)
        } else {
            None
        },
        is_valid: true,
        has_translation: record.is_some(),
        translation_version: record.map(|record| record.version),
    })
}

pub fn read_game_version(game_dir: &Path) -> Option<String> {
    let content = fs::read_to_string(game_dir.join(VERSION_FILE)).ok()?;
    let version = content.trim();
    (!version.is_empty()).then(|| version.to_owned())
}

pub fn read_marker(game_dir: &Path) -> Option<InstalledTranslationRecord> {
    let path = game_dir.join(TRANSLATION_MARKER);
    let content = fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!("marker: ignoring unreadable {} ({err})", path.display());
            None
        }
    }
}

pub fn write_marker(game_dir: &Path, version: &str) -> Result<InstalledTranslationRecord, String> {
    let record = InstalledTranslationRecord {
        version: version.to_owned(),
        installed_date: Utc::now(),
        files: TRANSLATION_DIRS
            .iter()
            .chain(TRANSLATION_FILES.iter())
            .map(|name| (*name).to_owned())
            .collect(),
    };
    let content = serde_json::to_string_pretty(&record)
        .map_err(|e| format!("failed to serialize translation info: {e}"))?;
    fs::write(game_dir.join(TRANSLATION_MARKER), content)
        .map_err(|e| format!("failed to write translation info: {e}"))?;
    Ok(record)
}

/// Copy the current translation files (never the game itself) into `translation_backup/`.
pub fn backup_translation(game_dir: &Path) -> Result<PathBuf, String> {
    let backup_dir = game_dir.join(BACKUP_DIR);
    if backup_dir.exists() {
        remove_path(&backup_dir)?;
    }
    fs::create_dir_all(&backup_dir)
        .map_err(|e| format!("failed to create backup directory: {e}"))?;

    for name in TRANSLATION_DIRS {
        let source = game_dir.join(name);
        if source.is_dir() {
            copy_dir(&source, &backup_dir.join(name))?;
        }
    }
    for name in TRANSLATION_FILES.into_iter().chain([TRANSLATION_MARKER]) {
        let source = game_dir.join(name);
        if source.is_file() {
            fs::copy(&source, backup_dir.join(name))
                .map_err(|e| format!("failed to back up {name}: {e}"))?;
        }
    }
    debug!("backup: saved translation files to {}", backup_dir.display());
    Ok(backup_dir)
}

pub fn remove_translation(game_dir: &Path) -> Result<(), String> {
    for name in TRANSLATION_DIRS.into_iter().chain(TRANSLATION_FILES) {
        let path = game_dir.join(name);
        if path.exists() {
            remove_path(&path)?;
        }
    }
    Ok(())
}

pub fn remove_marker(game_dir: &Path) -> Result<(), String> {
    let path = game_dir.join(TRANSLATION_MARKER);
    if path.exists() {
        remove_path(&path)?;
    }
    Ok(())
}

/// Locate the directory holding `BepInEx`, looking one level into wrapper folders.
pub fn find_translation_root(extracted: &Path) -> Result<PathBuf, String> {
    if extracted.join(TRANSLATION_DIRS[0]).is_dir() {
        return Ok(extracted.to_path_buf());
    }
    let entries =
        fs::read_dir(extracted).map_err(|e| format!("failed to read extracted files: {e}"))?;
    for entry in entries {
        let entry = entry.map_err(|e| format!("failed to read entry: {e}"))?;
        let path = entry.path();
        if path.is_dir() && path.join(TRANSLATION_DIRS[0]).is_dir() {
            return Ok(path);
        }
    }
    Ok(extracted.to_path_buf())
}

pub fn copy_translation_files(extracted: &Path, game_dir: &Path) -> Result<(), String> {
    let root = find_translation_root(extracted)?;
    let entries =
        fs::read_dir(&root).map_err(|e| format!("failed to read translation files: {e}"))?;
    for entry in entries {
        let entry = entry.map_err(|e| format!("failed to read entry: {e}"))?;
        let source = entry.path();
        let dest = game_dir.join(entry.file_name());
        if source.is_dir() {
            copy_dir(&source, &dest)?;
        } else {
            fs::copy(&source, &dest).map_err(|e| format!("failed to copy file: {e}"))?;
        }
    }
    Ok(())
}

/// Unpack `archive_path` under `dest`, returning how many files were written.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize, String> {
    let zip_err = |what: &str, err: &dyn std::fmt::Display| {
        format!("{what} {}: {err}", archive_path.display())
    };

    let reader = fs::File::open(archive_path).map_err(|e| zip_err("cannot open", &e))?;
    let mut archive = ZipArchive::new(reader).map_err(|e| zip_err("not a zip archive", &e))?;
    let mut written = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| zip_err("corrupt entry in", &e))?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("zip: skipping unsafe entry {}", entry.name());
            continue;
        };
        let target = dest.join(relative);
        let dir = if entry.is_dir() { Some(target.as_path()) } else { target.parent() };
        if let Some(dir) = dir {
            fs::create_dir_all(dir).map_err(|e| format!("cannot create {}: {e}", dir.display()))?;
        }
        if entry.is_file() {
            let mut out = fs::File::create(&target)
                .map_err(|e| format!("cannot create {}: {e}", target.display()))?;
            io::copy(&mut entry, &mut out)
                .map_err(|e| format!("cannot write {}: {e}", target.display()))?;
            written += 1;
        }
    }
    if written == 0 {
        return Err(format!("{} contains no files", archive_path.display()));
    }
    Ok(written)
}

pub fn copy_dir(from: &Path, to: &Path) -> Result<(), String> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| format!("walk error: {e}"))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| format!("path prefix error: {e}"))?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| format!("create dir error: {e}"))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| format!("create dir error: {e}"))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| format!("copy file error: {e}"))?;
        }
    }
    Ok(())
}

pub fn remove_path(path: &Path) -> Result<(), String> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| format!("failed to remove {}: {e}", path.display()))
}

/// Free bytes on the disk holding `path`, when it can be determined.
pub fn available_space(path: &Path) -> Option<u64> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn game_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in REQUIRED_GAME_FILES {
            fs::write(dir.path().join(file), b"").unwrap();
        }
        dir
    }

    #[test]
    fn lists_missing_game_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("UnityPlayer.dll"), b"").unwrap();
        let err = inspect_game_dir(dir.path(), false).unwrap_err();
        assert!(err.contains("PrincessConnectReDive.exe"));
        assert!(!err.contains("UnityPlayer.dll"));
    }

    #[test]
    fn valid_dir_without_marker_has_no_translation() {
        let dir = game_dir();
        fs::write(dir.path().join(VERSION_FILE), "5.1.0\n").unwrap();
        let info = inspect_game_dir(dir.path(), true).unwrap();
        assert!(info.is_valid);
        assert!(!info.has_translation);
        assert_eq!(info.version.as_deref(), Some("5.1.0"));
    }

    #[test]
    fn marker_drives_translation_state() {
        let dir = game_dir();
        write_marker(dir.path(), "PriconneTL_20240101").unwrap();
        let info = inspect_game_dir(dir.path(), false).unwrap();
        assert!(info.has_translation);
        assert_eq!(info.translation_version.as_deref(), Some("PriconneTL_20240101"));
        assert_eq!(read_marker(dir.path()).unwrap().version, "PriconneTL_20240101");
    }

    #[test]
    fn corrupt_marker_counts_as_not_installed() {
        let dir = game_dir();
        fs::write(dir.path().join(TRANSLATION_MARKER), "{ not json").unwrap();
        let info = inspect_game_dir(dir.path(), false).unwrap();
        assert!(!info.has_translation);
        assert!(read_marker(dir.path()).is_none());
    }

    #[test]
    fn backs_up_and_removes_only_translation_files() {
        let dir = game_dir();
        fs::create_dir_all(dir.path().join("BepInEx").join("plugins")).unwrap();
        fs::write(dir.path().join("BepInEx").join("plugins").join("tl.dll"), b"x").unwrap();
        fs::write(dir.path().join("dxgi.dll"), b"x").unwrap();

        let backup = backup_translation(dir.path()).unwrap();
        assert!(backup.join("BepInEx").join("plugins").join("tl.dll").is_file());
        assert!(backup.join("dxgi.dll").is_file());
        assert!(!backup.join("UnityPlayer.dll").exists());

        remove_translation(dir.path()).unwrap();
        assert!(!dir.path().join("BepInEx").exists());
        assert!(!dir.path().join("dxgi.dll").exists());
        assert!(dir.path().join("UnityPlayer.dll").exists());
    }

    #[test]
    fn finds_translation_root_inside_wrapper_folder() {
        let dir = TempDir::new().unwrap();
        let wrapped = dir.path().join("PriconneTL_20240101-VH");
        fs::create_dir_all(wrapped.join("BepInEx")).unwrap();
        assert_eq!(find_translation_root(dir.path()).unwrap(), wrapped);
    }

    #[test]
    fn extracts_and_copies_archive_into_game_dir() {
        let work = TempDir::new().unwrap();
        let archive_path = work.path().join("tl.zip");
        {
            let file = fs::File::create(&archive_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            writer
                .start_file("PriconneTL/BepInEx/config.cfg", options)
                .unwrap();
            writer.write_all(b"lang=vi").unwrap();
            writer.start_file("PriconneTL/dxgi.dll", options).unwrap();
            writer.write_all(b"dll").unwrap();
            writer.finish().unwrap();
        }
        let extracted = work.path().join("extracted");
        assert_eq!(extract_zip(&archive_path, &extracted).unwrap(), 2);

        let game = game_dir();
        copy_translation_files(&extracted, game.path()).unwrap();
        assert_eq!(
            fs::read_to_string(game.path().join("BepInEx").join("config.cfg")).unwrap(),
            "lang=vi"
        );
        assert!(game.path().join("dxgi.dll").is_file());
    }
}
