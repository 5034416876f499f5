use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quiz::ScoreSummary;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub attempt_id: String,
    pub correct: u32,
    pub total: u32,
    pub finished_at: DateTime<Utc>,
}

impl QuizResult {
    pub fn score(&self) -> ScoreSummary {
        ScoreSummary::new(self.correct, self.total)
    }
}
