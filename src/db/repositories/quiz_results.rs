use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_u32},
    models::QuizResult,
};

fn row_to_result(row: &Row) -> Result<QuizResult> {
    let finished_at: String = row.get("finished_at")?;

    Ok(QuizResult {
        attempt_id: row.get("attempt_id")?,
        correct: to_u32(row.get("correct")?, "correct")?,
        total: to_u32(row.get("total")?, "total")?,
        finished_at: parse_datetime(&finished_at, "finished_at")?,
    })
}

impl Database {
    /// Record a finished attempt. Recording the same attempt twice keeps the first row.
    pub async fn record_quiz_result(&self, result: &QuizResult) -> Result<bool> {
        let record = result.clone();
        self.execute(move |conn| {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO quiz_results (attempt_id, correct, total, finished_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        record.attempt_id,
                        record.correct,
                        record.total,
                        record.finished_at.to_rfc3339(),
                    ],
                )
                .context("failed to insert quiz result")?;
            Ok(inserted > 0)
        })
        .await
    }

    /// Most recent attempts first.
    pub async fn list_quiz_results(&self, limit: usize) -> Result<Vec<QuizResult>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT attempt_id, correct, total, finished_at
                 FROM quiz_results
                 ORDER BY finished_at DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_result(row)?);
            }
            Ok(results)
        })
        .await
    }
}
