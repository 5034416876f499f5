use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    quiz::state::{QuizTiming, INTERVAL_DURATION_SECS, QUESTION_DURATION_SECS},
    schedule::{COUNTDOWN_SECS, PRE_COUNTDOWN_SECS},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizSettings {
    pub question_duration_secs: u32,
    pub interval_duration_secs: u32,
    pub countdown_secs: u32,
    pub pre_countdown_secs: u32,
    pub questions_path: Option<PathBuf>,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_duration_secs: QUESTION_DURATION_SECS,
            interval_duration_secs: INTERVAL_DURATION_SECS,
            countdown_secs: COUNTDOWN_SECS,
            pre_countdown_secs: PRE_COUNTDOWN_SECS,
            questions_path: None,
        }
    }
}

impl QuizSettings {
    pub fn timing(&self) -> QuizTiming {
        QuizTiming::new(self.question_duration_secs, self.interval_duration_secs)
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<QuizSettings>,
}

impl SettingsStore {
    /// Missing or unparseable settings files fall back to defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings in {}: {err}", path.display());
                QuizSettings::default()
            })
        } else {
            QuizSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> QuizSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: QuizSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: QuizSettings = serde_json::from_str(&contents)?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &QuizSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, QuizSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, QuizSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
