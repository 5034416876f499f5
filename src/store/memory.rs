use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::db::QuizResult;
use crate::quiz::QuizSnapshot;

use super::{decode_snapshot, encode_snapshot, QuizStore};

#[derive(Default)]
struct MemoryInner {
    quiz_state: Option<String>,
    started_at: Option<DateTime<Utc>>,
    is_active: bool,
    results: Vec<QuizResult>,
}

/// In-process store. Snapshots still go through their serialized form so a
/// round trip behaves like durable storage.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored snapshot with arbitrary text.
    pub fn put_raw_state(&self, raw: impl Into<String>) {
        self.lock().quiz_state = Some(raw.into());
    }

    pub fn results(&self) -> Vec<QuizResult> {
        self.lock().results.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait::async_trait]
impl QuizStore for MemoryStore {
    async fn load_quiz_state(&self) -> Result<Option<QuizSnapshot>> {
        Ok(self.lock().quiz_state.as_deref().and_then(decode_snapshot))
    }

    async fn save_quiz_state(&self, snapshot: &QuizSnapshot) -> Result<()> {
        let encoded = encode_snapshot(snapshot)?;
        let mut inner = self.lock();
        inner.quiz_state = Some(encoded);
        inner.is_active = !snapshot.is_quiz_complete;
        Ok(())
    }

    async fn quiz_start_time(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.lock().started_at)
    }

    async fn set_quiz_start_time(&self, started_at: DateTime<Utc>) -> Result<()> {
        self.lock().started_at = Some(started_at);
        Ok(())
    }

    async fn is_quiz_active(&self) -> Result<bool> {
        Ok(self.lock().is_active)
    }

    async fn clear_quiz_state(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.quiz_state = None;
        inner.started_at = None;
        inner.is_active = false;
        Ok(())
    }

    async fn record_quiz_result(&self, result: &QuizResult) -> Result<bool> {
        let mut inner = self.lock();
        if inner
            .results
            .iter()
            .any(|existing| existing.attempt_id == result.attempt_id)
        {
            return Ok(false);
        }
        inner.results.insert(0, result.clone());
        Ok(true)
    }
}
