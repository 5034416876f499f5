pub mod db;
pub mod models;
pub mod questions;
pub mod quiz;
pub mod schedule;
pub mod settings;
pub mod store;
mod terminal;
mod utils;

use std::{env, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::{error, info};

use db::Database;
use quiz::QuizController;
use schedule::ScheduledTime;
use settings::SettingsStore;

const DEFAULT_DATA_DIR: &str = ".flagquiz";

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Flag quiz starting up...");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run_app()) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run_app() -> Result<()> {
    let data_dir = env::var_os("FLAGQUIZ_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings = SettingsStore::new(data_dir.join("settings.json"))?.get();
    let database = Database::new(data_dir.join("flagquiz.sqlite3"))?;

    let questions_path = env::var_os("FLAGQUIZ_QUESTIONS")
        .map(PathBuf::from)
        .or_else(|| settings.questions_path.clone());
    let questions = questions::load_questions(questions_path.as_deref());

    let schedule = env::var("FLAGQUIZ_SCHEDULE")
        .ok()
        .map(|raw| raw.parse::<ScheduledTime>())
        .transpose()
        .context("FLAGQUIZ_SCHEDULE must be HH:MM:SS")?;

    let controller = QuizController::new(Arc::new(database.clone()), settings.timing());

    terminal::run_session(&controller, &database, &settings, questions, schedule).await
}
