use std::{fs, path::Path};

use log::{info, warn};

use crate::models::{Question, QuizData};

const BUNDLED_QUESTIONS: &str = include_str!("questions.json");

/// Parse a question bank. Malformed input yields an empty bank.
pub fn parse_questions(raw: &str) -> Vec<Question> {
    match serde_json::from_str::<QuizData>(raw) {
        Ok(data) => data.questions,
        Err(err) => {
            warn!("Failed to parse question bank: {err}");
            Vec::new()
        }
    }
}

pub fn bundled_questions() -> Vec<Question> {
    parse_questions(BUNDLED_QUESTIONS)
}

/// Load questions from `path`, or the bundled bank when no path is given.
pub fn load_questions(path: Option<&Path>) -> Vec<Question> {
    let Some(path) = path else {
        let questions = bundled_questions();
        info!("Loaded {} bundled questions", questions.len());
        return questions;
    };

    match fs::read_to_string(path) {
        Ok(contents) => {
            let questions = parse_questions(&contents);
            info!("Loaded {} questions from {}", questions.len(), path.display());
            questions
        }
        Err(err) => {
            warn!("Failed to read question bank {}: {err}", path.display());
            Vec::new()
        }
    }
}
