use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{
    connection::Database,
    helpers::{parse_bool, parse_epoch_millis},
};
use crate::quiz::QuizSnapshot;
use crate::store::{decode_snapshot, encode_snapshot};

const KEY_QUIZ_STATE: &str = "quiz_state";
const KEY_QUIZ_START_TIME: &str = "quiz_start_time";
const KEY_IS_QUIZ_ACTIVE: &str = "is_quiz_active";

fn get_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("failed to read {key}"))
}

fn set_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET
             value = excluded.value,
             updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
    )
    .with_context(|| format!("failed to write {key}"))?;
    Ok(())
}

impl Database {
    /// Persist the snapshot together with the active flag.
    pub async fn save_quiz_state(&self, snapshot: &QuizSnapshot) -> Result<()> {
        let serialized = encode_snapshot(snapshot).context("failed to serialize quiz state")?;
        let active = !snapshot.is_quiz_complete;

        self.execute(move |conn| {
            let tx = conn.transaction()?;
            set_value(&tx, KEY_QUIZ_STATE, &serialized)?;
            set_value(&tx, KEY_IS_QUIZ_ACTIVE, if active { "true" } else { "false" })?;
            tx.commit().context("failed to commit quiz state")?;
            Ok(())
        })
        .await
    }

    /// Load the stored snapshot. Unparseable or inconsistent snapshots are
    /// discarded and reported as absent.
    pub async fn load_quiz_state(&self) -> Result<Option<QuizSnapshot>> {
        let raw = self
            .execute(|conn| get_value(conn, KEY_QUIZ_STATE))
            .await?;

        Ok(raw.as_deref().and_then(decode_snapshot))
    }

    pub async fn quiz_start_time(&self) -> Result<Option<DateTime<Utc>>> {
        let raw = self
            .execute(|conn| get_value(conn, KEY_QUIZ_START_TIME))
            .await?;

        match raw {
            Some(raw) => match parse_epoch_millis(&raw, KEY_QUIZ_START_TIME) {
                Ok(started_at) => Ok(Some(started_at)),
                Err(err) => {
                    warn!("Ignoring malformed quiz start time: {err:#}");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub async fn set_quiz_start_time(&self, started_at: DateTime<Utc>) -> Result<()> {
        let millis = started_at.timestamp_millis().to_string();
        self.execute(move |conn| set_value(conn, KEY_QUIZ_START_TIME, &millis))
            .await
    }

    pub async fn is_quiz_active(&self) -> Result<bool> {
        let raw = self
            .execute(|conn| get_value(conn, KEY_IS_QUIZ_ACTIVE))
            .await?;
        Ok(raw.as_deref().is_some_and(parse_bool))
    }

    pub async fn clear_quiz_state(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute(
                "DELETE FROM kv_store WHERE key IN (?1, ?2, ?3)",
                params![KEY_QUIZ_STATE, KEY_QUIZ_START_TIME, KEY_IS_QUIZ_ACTIVE],
            )
            .context("failed to clear quiz state")?;
            Ok(())
        })
        .await
    }

    #[cfg(test)]
    pub(crate) async fn put_raw_value(&self, key: &'static str, value: &'static str) -> Result<()> {
        self.execute(move |conn| set_value(conn, key, value)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Country, Question};
    use crate::quiz::QuizTiming;

    fn snapshot() -> QuizSnapshot {
        let questions = vec![Question {
            answer_id: 7,
            countries: vec![Country {
                country_name: "Chile".into(),
                id: 7,
            }],
            country_code: "CL".into(),
        }];
        QuizSnapshot::fresh(questions, QuizTiming::default())
    }

    #[tokio::test]
    async fn saves_and_loads_snapshot_with_active_flag() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.load_quiz_state().await.unwrap(), None);
        assert!(!db.is_quiz_active().await.unwrap());

        let mut state = snapshot();
        db.save_quiz_state(&state).await.unwrap();
        assert_eq!(db.load_quiz_state().await.unwrap(), Some(state.clone()));
        assert!(db.is_quiz_active().await.unwrap());

        state.is_quiz_complete = true;
        db.save_quiz_state(&state).await.unwrap();
        assert!(!db.is_quiz_active().await.unwrap());
    }

    #[tokio::test]
    async fn malformed_snapshot_is_discarded() {
        let db = Database::in_memory().unwrap();
        db.put_raw_value(KEY_QUIZ_STATE, "{\"questions\": 12").await.unwrap();
        assert_eq!(db.load_quiz_state().await.unwrap(), None);

        db.put_raw_value(
            KEY_QUIZ_STATE,
            r#"{"questions":[],"currentQuestionIndex":0,"questionTimer":30,"intervalTimer":10,
                "isShowingInterval":false,"isQuizComplete":false,"correctAnswers":0,
                "totalQuestions":3,"selectedAnswerId":null,"isAnswered":false,
                "correctAnswerId":null,"answerTime":null}"#,
        )
        .await
        .unwrap();
        assert_eq!(db.load_quiz_state().await.unwrap(), None);
    }

    #[tokio::test]
    async fn start_time_round_trips_at_millisecond_precision() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.quiz_start_time().await.unwrap(), None);

        let started_at = DateTime::from_timestamp_millis(1_760_000_123_456).unwrap();
        db.set_quiz_start_time(started_at).await.unwrap();
        assert_eq!(db.quiz_start_time().await.unwrap(), Some(started_at));

        db.put_raw_value(KEY_QUIZ_START_TIME, "yesterday").await.unwrap();
        assert_eq!(db.quiz_start_time().await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_removes_every_quiz_key() {
        let db = Database::in_memory().unwrap();
        db.save_quiz_state(&snapshot()).await.unwrap();
        db.set_quiz_start_time(Utc::now()).await.unwrap();

        db.clear_quiz_state().await.unwrap();
        assert_eq!(db.load_quiz_state().await.unwrap(), None);
        assert_eq!(db.quiz_start_time().await.unwrap(), None);
        assert!(!db.is_quiz_active().await.unwrap());
    }

    #[tokio::test]
    async fn state_survives_reopening_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz.sqlite3");
        let state = snapshot();

        {
            let db = Database::new(path.clone()).unwrap();
            db.save_quiz_state(&state).await.unwrap();
        }

        let db = Database::new(path).unwrap();
        assert_eq!(db.load_quiz_state().await.unwrap(), Some(state));
    }
}
