//! Persistence seam for the quiz controller.
//!
//! The controller only ever sees [`QuizStore`]: a snapshot slot, the attempt's
//! start timestamp, the active flag and the results history.
//! [`Database`](crate::db::Database) backs it with SQLite; [`MemoryStore`]
//! keeps everything in process.

mod memory;
mod sqlite;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::warn;

use crate::db::QuizResult;
use crate::quiz::QuizSnapshot;

pub use memory::MemoryStore;

#[async_trait::async_trait]
pub trait QuizStore: Send + Sync {
    /// Returns `Ok(None)` when nothing usable is stored, including malformed snapshots.
    async fn load_quiz_state(&self) -> Result<Option<QuizSnapshot>>;

    /// Writes the snapshot and sets the active flag to `!is_quiz_complete`.
    async fn save_quiz_state(&self, snapshot: &QuizSnapshot) -> Result<()>;

    async fn quiz_start_time(&self) -> Result<Option<DateTime<Utc>>>;

    async fn set_quiz_start_time(&self, started_at: DateTime<Utc>) -> Result<()>;

    async fn is_quiz_active(&self) -> Result<bool>;

    /// Removes the snapshot, start timestamp and active flag.
    async fn clear_quiz_state(&self) -> Result<()>;

    /// Returns `false` when the attempt was already recorded.
    async fn record_quiz_result(&self, result: &QuizResult) -> Result<bool>;
}

pub(crate) fn encode_snapshot(snapshot: &QuizSnapshot) -> Result<String> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Parse a stored snapshot, discarding anything malformed or inconsistent.
pub(crate) fn decode_snapshot(raw: &str) -> Option<QuizSnapshot> {
    match serde_json::from_str::<QuizSnapshot>(raw) {
        Ok(snapshot) if snapshot.is_consistent() => Some(snapshot),
        Ok(_) => {
            warn!("Discarding inconsistent persisted quiz state");
            None
        }
        Err(err) => {
            warn!("Discarding malformed persisted quiz state: {err}");
            None
        }
    }
}
