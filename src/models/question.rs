use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizData {
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub answer_id: u32,
    pub countries: Vec<Country>,
    pub country_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Country {
    pub country_name: String,
    pub id: u32,
}

impl Question {
    pub fn is_correct(&self, answer_id: u32) -> bool {
        self.answer_id == answer_id
    }

    pub fn correct_country(&self) -> Option<&Country> {
        self.countries.iter().find(|c| c.id == self.answer_id)
    }

    /// Regional-indicator rendering of the two-letter country code, e.g. `"NZ"` -> 🇳🇿.
    /// Returns `None` for codes that are not exactly two ASCII letters.
    pub fn flag_emoji(&self) -> Option<String> {
        let code = self.country_code.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        code.to_ascii_uppercase()
            .chars()
            .map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
            .collect()
    }
}
