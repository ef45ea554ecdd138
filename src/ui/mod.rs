//! Terminal presentation: status listings and a live progress bar fed by engine updates.

use std::future::Future;

use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use tokio::sync::mpsc;

use crate::engine::InstallerEngine;
use crate::engine::models::{
    AppConfiguration, AppUpdateInfo, InstalledTranslationRecord, OperationProgress,
    TranslationRelease,
};
use crate::engine::state::{AppUpdateState, ControllerState, EngineUpdate};
use crate::util::format_bytes;

mod i18n;

pub use i18n::I18n;

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {wide_msg}";

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    match ProgressStyle::with_template(BAR_TEMPLATE) {
        Ok(style) => bar.set_style(style.progress_chars("=> ")),
        Err(err) => warn!("ui: invalid progress template: {err}"),
    }
    bar
}

/// Await `work` while drawing every update that arrives on `updates`.
pub async fn with_progress<T>(
    updates: &mut mpsc::UnboundedReceiver<EngineUpdate>,
    i18n: I18n,
    work: impl Future<Output = T>,
) -> T {
    let bar = progress_bar();
    tokio::pin!(work);
    let outcome = loop {
        tokio::select! {
            biased;
            outcome = &mut work => break outcome,
            Some(update) = updates.recv() => render_update(&bar, update, i18n),
        }
    };
    while let Ok(update) = updates.try_recv() {
        render_update(&bar, update, i18n);
    }
    if !bar.is_finished() {
        bar.finish_and_clear();
    }
    outcome
}

fn render_update(bar: &ProgressBar, update: EngineUpdate, i18n: I18n) {
    match update {
        EngineUpdate::TranslationProgress(progress) | EngineUpdate::AppUpdateProgress(progress) => {
            show_progress(bar, &progress);
        }
        EngineUpdate::Translation(ControllerState::Succeeded(kind)) => {
            bar.finish_with_message(i18n.operation_done(kind));
        }
        EngineUpdate::Translation(ControllerState::Failed { reason, .. })
        | EngineUpdate::AppUpdate(AppUpdateState::Failed(reason)) => {
            bar.abandon_with_message(i18n.failed(&reason));
        }
        EngineUpdate::Translation(_) | EngineUpdate::AppUpdate(_) => {}
    }
}

fn show_progress(bar: &ProgressBar, progress: &OperationProgress) {
    bar.set_position(progress.percent.clamp(0.0, 100.0).round() as u64);
    bar.set_message(progress.message.clone());
}

pub fn print_status(engine: &InstallerEngine, i18n: I18n) {
    let Some(installation) = engine.resolver().installation() else {
        println!("{}: {}", i18n.game_directory(), i18n.game_not_found());
        if let Some(err) = engine.resolver().error() {
            println!("  {err}");
        }
        return;
    };
    println!(
        "{}: {}",
        i18n.game_directory(),
        installation.path.display()
    );
    println!(
        "{}: {}",
        i18n.game_version(),
        installation.version.as_deref().unwrap_or("-")
    );
    println!(
        "{}: {}",
        i18n.translation(),
        installed_summary(engine.controller().installed().as_ref(), i18n)
    );

    if let Some(release) = engine.selected_release() {
        let action = engine
            .classify_selected()
            .map(|action| i18n.action_label(action))
            .unwrap_or("-");
        println!(
            "{}: {} [{}]",
            i18n.selected_release(),
            release.version,
            action
        );
    }
    if engine.catalog().is_stale()
        && let Some(err) = engine.catalog().last_error()
    {
        println!("{}", i18n.stale_catalog(&err.to_string()));
    }
    if let Some(info) = engine.app_updater().pending() {
        println!(
            "{}",
            i18n.app_update_available(&info.version, &info.current_version)
        );
    }
    print_activity(engine, i18n);
}

// In-flight progress and the last failure of either slot.
fn print_activity(engine: &InstallerEngine, i18n: I18n) {
    let controller = engine.controller();
    if matches!(controller.state(), ControllerState::Busy(_))
        && let Some(progress) = controller.progress()
    {
        println!("{}", progress_line(&progress));
    }
    let updater = engine.app_updater();
    if !updater.state().is_idle()
        && let Some(progress) = updater.progress()
    {
        println!("{}", progress_line(&progress));
    }
    for err in [controller.last_error(), updater.last_error()].into_iter().flatten() {
        println!("{}", i18n.failed(&err));
    }
}

fn progress_line(progress: &OperationProgress) -> String {
    format!("{:>3.0}% {}", progress.percent, progress.message)
}

fn installed_summary(record: Option<&InstalledTranslationRecord>, i18n: I18n) -> String {
    match record {
        Some(record) => i18n.installed_on(
            &record.version,
            &record.installed_date.format("%Y-%m-%d").to_string(),
        ),
        None => i18n.not_installed().to_owned(),
    }
}

pub fn print_releases(engine: &InstallerEngine, i18n: I18n) {
    let Some(catalog) = engine.catalog().catalog() else {
        println!("{}", i18n.no_releases());
        return;
    };
    if engine.catalog().is_stale()
        && let Some(err) = engine.catalog().last_error()
    {
        println!("{}", i18n.stale_catalog(&err.to_string()));
    }
    let installed = engine.controller().installed();
    let default = catalog.default_release().map(|release| release.version.clone());
    for release in &catalog.releases {
        let is_installed = installed
            .as_ref()
            .is_some_and(|record| record.version == release.version);
        let is_default = default.as_deref() == Some(release.version.as_str());
        println!("{}", release_line(release, is_installed, is_default, i18n));
        for line in &release.changelog {
            println!("    {line}");
        }
    }
}

fn release_line(
    release: &TranslationRelease,
    is_installed: bool,
    is_default: bool,
    i18n: I18n,
) -> String {
    let mut tags = Vec::new();
    if is_installed {
        tags.push(i18n.installed_tag());
    }
    if is_default {
        tags.push(i18n.default_tag());
    }
    let mut line = format!(
        "{}  {}  {}  {}",
        release.version,
        release.release_date.format("%Y-%m-%d"),
        format_bytes(release.file_size_bytes),
        i18n.downloads(release.download_count)
    );
    if !tags.is_empty() {
        line.push_str(&format!("  ({})", tags.join(", ")));
    }
    line
}

pub fn print_translation_update(release: &TranslationRelease, i18n: I18n) {
    println!("{}", i18n.translation_update_available(&release.version));
}

pub fn print_app_update(info: Option<&AppUpdateInfo>, i18n: I18n) {
    match info {
        Some(info) => {
            println!(
                "{}",
                i18n.app_update_available(&info.version, &info.current_version)
            );
            for line in &info.changelog {
                println!("    {line}");
            }
        }
        None => println!("{}", i18n.app_up_to_date()),
    }
}

pub fn print_app_update_launched(i18n: I18n) {
    println!("{}", i18n.app_update_launched());
}

pub fn print_config(config: &AppConfiguration, i18n: I18n) {
    let game_path = config
        .game_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "-".into());
    println!("{}: {}", i18n.game_directory(), game_path);
    println!(
        "{}: {}",
        i18n.setting_label("auto_update"),
        i18n.yes_no(config.auto_update)
    );
    println!(
        "{}: {}",
        i18n.setting_label("auto_start"),
        i18n.yes_no(config.auto_start_with_os)
    );
    println!(
        "{}: {}",
        i18n.setting_label("check_update_on_startup"),
        i18n.yes_no(config.check_update_on_startup)
    );
    println!(
        "{}: {}",
        i18n.setting_label("github_repo"),
        config.source_repository
    );
    println!(
        "{}: {}",
        i18n.setting_label("language"),
        i18n.language_name(config.language)
    );
}
