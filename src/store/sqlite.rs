use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::db::{Database, QuizResult};
use crate::quiz::QuizSnapshot;

use super::QuizStore;

#[async_trait::async_trait]
impl QuizStore for Database {
    async fn load_quiz_state(&self) -> Result<Option<QuizSnapshot>> {
        Database::load_quiz_state(self).await
    }

    async fn save_quiz_state(&self, snapshot: &QuizSnapshot) -> Result<()> {
        Database::save_quiz_state(self, snapshot).await
    }

    async fn quiz_start_time(&self) -> Result<Option<DateTime<Utc>>> {
        Database::quiz_start_time(self).await
    }

    async fn set_quiz_start_time(&self, started_at: DateTime<Utc>) -> Result<()> {
        Database::set_quiz_start_time(self, started_at).await
    }

    async fn is_quiz_active(&self) -> Result<bool> {
        Database::is_quiz_active(self).await
    }

    async fn clear_quiz_state(&self) -> Result<()> {
        Database::clear_quiz_state(self).await
    }

    async fn record_quiz_result(&self, result: &QuizResult) -> Result<bool> {
        Database::record_quiz_result(self, result).await
    }
}
