use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use env_logger::Env;
use log::{error, warn};
use tokio::sync::mpsc;

use crate::backend::{Backend, LocalBackend};
use crate::engine::InstallerEngine;
use crate::engine::models::Language;
use crate::engine::progress::ProgressBridge;
use crate::engine::state::UserAction;
use crate::error::InstallerError;
use crate::storage::{FileConfigStore, Settings};
use crate::ui::I18n;

mod backend;
mod catalog;
mod engine;
mod env;
mod error;
mod game;
mod networking;
mod process;
mod storage;
#[cfg(test)]
mod testing;
mod ui;
mod updater;
mod util;

#[derive(Parser, Debug)]
#[command(
    name = "priconevh",
    author,
    version,
    about = "Installs and updates the Vietnamese translation for Princess Connect! Re:Dive"
)]
struct Cli {
    /// Read and write settings at this path instead of the per-user config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the game directory, installed translation and selected release.
    Status,
    /// Probe the default install location.
    Detect,
    /// Use PATH as the game directory, or pick one in a dialog.
    Select { path: Option<PathBuf> },
    /// List published translation releases.
    Releases,
    /// Install VERSION (default: newest), reinstalling or updating as needed.
    Install { version: Option<String> },
    /// Replace the installed translation with VERSION (default: newest).
    Update { version: Option<String> },
    /// Remove the translation from the game directory.
    Uninstall,
    /// Check whether a newer installer is available.
    Check,
    /// Download and launch the newest installer.
    SelfUpdate,
    /// Reveal the game directory in the file manager.
    Open,
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    /// Fetch releases from OWNER/REPO.
    SetRepo { repo: String },
    AutoUpdate {
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        enabled: bool,
    },
    AutoStart {
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        enabled: bool,
    },
    /// One of: vi, en, ja.
    Language { code: String },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            error!("failed to create Tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            if err.is_path_error() {
                eprintln!("hint: run `priconevh select <PATH>` to choose the game folder");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), InstallerError> {
    let store = match &cli.config {
        Some(path) => FileConfigStore::at(path),
        None => FileConfigStore::new(),
    };
    let (settings, load_error) = Settings::load_or_default(Box::new(store)).await;
    if let Some(err) = load_error {
        eprintln!("{err}");
    }
    let settings = Arc::new(settings);
    let config = settings.current();
    let i18n = I18n::new(config.language);

    let command = match cli.command.unwrap_or(Command::Status) {
        Command::Config(action) => return run_config(&settings, action).await,
        command => command,
    };

    let bridge = ProgressBridge::new();
    let backend: Arc<dyn Backend> =
        Arc::new(LocalBackend::new(config.source_repository.clone(), &bridge));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = InstallerEngine::new(backend, bridge, settings, Some(tx));
    engine.bootstrap().await;
    while rx.try_recv().is_ok() {}

    match command {
        Command::Status => {
            if config.check_update_on_startup
                && let Err(err) = engine.app_updater().check_for_update().await
            {
                warn!("{err}");
            }
            ui::print_status(&engine, i18n);
            if config.auto_update
                && let Some(installed) = engine.controller().installed()
            {
                match engine.catalog().check_for_update(&installed.version).await {
                    Ok(Some(release)) => ui::print_translation_update(&release, i18n),
                    Ok(None) => {}
                    Err(err) => warn!("{err}"),
                }
            }
        }
        Command::Detect => {
            engine.handle_action(UserAction::AutoDetect).await?;
            ui::print_status(&engine, i18n);
        }
        Command::Select { path } => {
            let action = match path {
                Some(path) => UserAction::UseGamePath(path),
                None => UserAction::SelectGameDirectory,
            };
            engine.handle_action(action).await?;
            ui::print_status(&engine, i18n);
        }
        Command::Releases => ui::print_releases(&engine, i18n),
        Command::Install { version } => {
            if let Some(version) = version {
                engine.select_release(&version)?;
            }
            let action = ui::with_progress(&mut rx, i18n, engine.apply_selected()).await?;
            println!("{}", i18n.action_label(action));
            ui::print_status(&engine, i18n);
        }
        Command::Update { version } => {
            if let Some(version) = version {
                engine.select_release(&version)?;
            }
            ui::with_progress(&mut rx, i18n, engine.update_selected()).await?;
            ui::print_status(&engine, i18n);
        }
        Command::Uninstall => {
            ui::with_progress(&mut rx, i18n, engine.uninstall()).await?;
            ui::print_status(&engine, i18n);
        }
        Command::Check => {
            let info = engine.app_updater().check_for_update().await?;
            ui::print_app_update(info.as_ref(), i18n);
        }
        Command::SelfUpdate => {
            let info = engine.app_updater().check_for_update().await?;
            ui::print_app_update(info.as_ref(), i18n);
            if info.is_some() {
                ui::with_progress(
                    &mut rx,
                    i18n,
                    engine.handle_action(UserAction::InstallAppUpdate),
                )
                .await?;
                ui::print_app_update_launched(i18n);
            }
        }
        Command::Open => {
            let installation = engine
                .resolver()
                .installation()
                .ok_or(InstallerError::PathNotFound)?;
            process::open_directory(&installation.path).map_err(InstallerError::PathInvalid)?;
        }
        // Handled before the engine starts.
        Command::Config(_) => {}
    }
    Ok(())
}

async fn run_config(settings: &Settings, action: ConfigCommand) -> Result<(), InstallerError> {
    match action {
        ConfigCommand::Show => {}
        ConfigCommand::SetRepo { repo } => settings.set_source_repository(&repo).await?,
        ConfigCommand::AutoUpdate { enabled } => settings.toggle_auto_update(enabled).await?,
        ConfigCommand::AutoStart { enabled } => settings.toggle_auto_start(enabled).await?,
        ConfigCommand::Language { code } => {
            let language = Language::from_code(&code).ok_or_else(|| {
                InstallerError::ConfigSaveFailed(format!("unsupported language: {code}"))
            })?;
            settings.set_language(language).await?;
        }
    }
    let config = settings.current();
    ui::print_config(&config, I18n::new(config.language));
    Ok(())
}
