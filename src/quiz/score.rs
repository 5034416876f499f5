use serde::{Deserialize, Serialize};

const POINTS_PER_QUESTION: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSummary {
    pub correct: u32,
    pub total: u32,
}

impl ScoreSummary {
    pub fn new(correct: u32, total: u32) -> Self {
        Self { correct, total }
    }

    /// Whole percentage, rounded down. Zero for an empty quiz.
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        self.correct * 100 / self.total
    }

    pub fn points(&self) -> u32 {
        self.correct * POINTS_PER_QUESTION
    }

    pub fn max_points(&self) -> u32 {
        self.total * POINTS_PER_QUESTION
    }
}

impl std::fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} correct ({}%), {} / {} points",
            self.correct,
            self.total,
            self.percentage(),
            self.points(),
            self.max_points()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_down() {
        assert_eq!(ScoreSummary::new(7, 10).percentage(), 70);
        assert_eq!(ScoreSummary::new(2, 3).percentage(), 66);
        assert_eq!(ScoreSummary::new(0, 0).percentage(), 0);
    }

    #[test]
    fn points_scale_by_ten() {
        let score = ScoreSummary::new(7, 10);
        assert_eq!(score.points(), 70);
        assert_eq!(score.max_points(), 100);
        assert_eq!(score.to_string(), "7 / 10 correct (70%), 70 / 100 points");
    }
}
