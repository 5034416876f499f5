use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Question;

use super::ScoreSummary;

pub const QUESTION_DURATION_SECS: u32 = 30;
pub const INTERVAL_DURATION_SECS: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizTiming {
    pub question_secs: u32,
    pub interval_secs: u32,
}

impl Default for QuizTiming {
    fn default() -> Self {
        Self {
            question_secs: QUESTION_DURATION_SECS,
            interval_secs: INTERVAL_DURATION_SECS,
        }
    }
}

impl QuizTiming {
    /// Both phases last at least one second.
    pub fn new(question_secs: u32, interval_secs: u32) -> Self {
        Self {
            question_secs: question_secs.max(1),
            interval_secs: interval_secs.max(1),
        }
    }

    pub fn period_secs(&self) -> u64 {
        u64::from(self.question_secs) + u64::from(self.interval_secs)
    }

    /// Where a quiz of `question_count` questions stands `elapsed_secs` after it started.
    pub fn position_at(&self, elapsed_secs: u64, question_count: usize) -> QuizPosition {
        let period = self.period_secs();
        let index = elapsed_secs / period;
        if index >= question_count as u64 {
            return QuizPosition::Complete;
        }

        let index = index as usize;
        let offset = elapsed_secs % period;
        if offset < u64::from(self.question_secs) {
            QuizPosition::Question {
                index,
                remaining: (u64::from(self.question_secs) - offset) as u32,
            }
        } else {
            QuizPosition::Interval {
                index,
                remaining: (period - offset) as u32,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPosition {
    Question { index: usize, remaining: u32 },
    Interval { index: usize, remaining: u32 },
    Complete,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum QuizPhase {
    Loading,
    Question,
    Interval,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoQuestion,
    AlreadyAnswered,
    QuestionClosed,
    QuizComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// `skipped_secs` is the question time left unused by answering early.
    Recorded { correct: bool, skipped_secs: u32 },
    Ignored(IgnoreReason),
}

/// What a single one-second tick did to the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Idle,
    Counted,
    IntervalStarted,
    Advanced,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizSnapshot {
    #[serde(default)]
    pub attempt_id: Option<String>,
    #[serde(default)]
    pub timing: QuizTiming,
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    pub question_timer: u32,
    pub interval_timer: u32,
    pub is_showing_interval: bool,
    pub is_quiz_complete: bool,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub selected_answer_id: Option<u32>,
    pub is_answered: bool,
    pub correct_answer_id: Option<u32>,
    pub answer_time: Option<DateTime<Utc>>,
}

impl Default for QuizSnapshot {
    fn default() -> Self {
        let timing = QuizTiming::default();
        Self {
            attempt_id: None,
            timing,
            questions: Vec::new(),
            current_question_index: 0,
            question_timer: timing.question_secs,
            interval_timer: timing.interval_secs,
            is_showing_interval: false,
            is_quiz_complete: false,
            correct_answers: 0,
            total_questions: 0,
            selected_answer_id: None,
            is_answered: false,
            correct_answer_id: None,
            answer_time: None,
        }
    }
}

impl QuizSnapshot {
    /// A new attempt positioned on the first question with a full timer.
    pub fn fresh(questions: Vec<Question>, timing: QuizTiming) -> Self {
        Self {
            attempt_id: Some(Uuid::new_v4().to_string()),
            timing,
            total_questions: questions.len() as u32,
            questions,
            question_timer: timing.question_secs,
            interval_timer: timing.interval_secs,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> QuizPhase {
        if self.is_quiz_complete {
            QuizPhase::Complete
        } else if self.questions.is_empty() {
            QuizPhase::Loading
        } else if self.is_showing_interval {
            QuizPhase::Interval
        } else {
            QuizPhase::Question
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.is_quiz_complete {
            return None;
        }
        self.questions.get(self.current_question_index)
    }

    /// One-based number for display.
    pub fn question_number(&self) -> usize {
        self.current_question_index + 1
    }

    pub fn score(&self) -> ScoreSummary {
        ScoreSummary::new(self.correct_answers, self.total_questions)
    }

    /// Persisted snapshots failing this check are discarded on load.
    pub fn is_consistent(&self) -> bool {
        if self.timing.question_secs == 0 || self.timing.interval_secs == 0 {
            return false;
        }
        if self.total_questions as usize != self.questions.len() {
            return false;
        }
        if self.correct_answers > self.total_questions {
            return false;
        }
        if !self.is_quiz_complete
            && !self.questions.is_empty()
            && self.current_question_index >= self.questions.len()
        {
            return false;
        }
        let answer_recorded = self.selected_answer_id.is_some() && self.correct_answer_id.is_some();
        if self.is_answered && !answer_recorded {
            return false;
        }
        self.question_timer <= self.timing.question_secs
            && self.interval_timer <= self.timing.interval_secs
    }

    pub fn select_answer(&mut self, answer_id: u32, now: DateTime<Utc>) -> AnswerOutcome {
        if self.is_quiz_complete {
            return AnswerOutcome::Ignored(IgnoreReason::QuizComplete);
        }
        let Some(question) = self.current_question() else {
            return AnswerOutcome::Ignored(IgnoreReason::NoQuestion);
        };
        let expected = question.answer_id;
        let correct = question.is_correct(answer_id);
        if self.is_answered {
            return AnswerOutcome::Ignored(IgnoreReason::AlreadyAnswered);
        }
        if self.is_showing_interval {
            return AnswerOutcome::Ignored(IgnoreReason::QuestionClosed);
        }

        let skipped_secs = self.question_timer;

        self.selected_answer_id = Some(answer_id);
        self.correct_answer_id = Some(expected);
        self.is_answered = true;
        self.answer_time = Some(now);
        if correct {
            self.correct_answers += 1;
        }

        self.question_timer = 0;
        self.is_showing_interval = true;
        self.interval_timer = self.timing.interval_secs;

        AnswerOutcome::Recorded {
            correct,
            skipped_secs,
        }
    }

    pub fn tick(&mut self) -> Transition {
        if self.is_quiz_complete || self.questions.is_empty() {
            return Transition::Idle;
        }

        if !self.is_showing_interval {
            self.question_timer = self.question_timer.saturating_sub(1);
            if self.question_timer == 0 {
                self.is_showing_interval = true;
                self.interval_timer = self.timing.interval_secs;
                return Transition::IntervalStarted;
            }
            return Transition::Counted;
        }

        self.interval_timer = self.interval_timer.saturating_sub(1);
        if self.interval_timer == 0 {
            return self.advance();
        }
        Transition::Counted
    }

    /// Jump to a position derived from elapsed time. Positions behind the
    /// current question are ignored so that a clock moving backwards cannot
    /// reopen an earlier question. Returns whether the snapshot changed.
    pub fn apply_position(&mut self, position: QuizPosition) -> bool {
        if self.is_quiz_complete {
            return false;
        }

        let before = self.clone();
        match position {
            QuizPosition::Complete => self.complete(),
            QuizPosition::Question { index, remaining } => {
                if !self.move_to(index) {
                    return false;
                }
                self.is_showing_interval = false;
                self.question_timer = remaining.min(self.timing.question_secs);
                self.interval_timer = self.timing.interval_secs;
            }
            QuizPosition::Interval { index, remaining } => {
                if !self.move_to(index) {
                    return false;
                }
                self.is_showing_interval = true;
                self.question_timer = 0;
                self.interval_timer = remaining.min(self.timing.interval_secs);
            }
        }
        *self != before
    }

    /// True when the question at `index` has already been answered in this snapshot.
    pub fn is_answered_at(&self, index: usize) -> bool {
        self.is_answered && self.current_question_index == index
    }

    fn move_to(&mut self, index: usize) -> bool {
        if index < self.current_question_index || index >= self.questions.len() {
            return false;
        }
        if index != self.current_question_index {
            self.current_question_index = index;
            self.clear_answer();
        }
        true
    }

    fn advance(&mut self) -> Transition {
        let next = self.current_question_index + 1;
        if next >= self.questions.len() {
            self.complete();
            return Transition::Completed;
        }

        self.current_question_index = next;
        self.question_timer = self.timing.question_secs;
        self.interval_timer = self.timing.interval_secs;
        self.is_showing_interval = false;
        self.clear_answer();
        Transition::Advanced
    }

    fn complete(&mut self) {
        self.is_quiz_complete = true;
        self.is_showing_interval = false;
        self.question_timer = 0;
        self.interval_timer = 0;
        self.current_question_index = self.questions.len().saturating_sub(1);
    }

    fn clear_answer(&mut self) {
        self.selected_answer_id = None;
        self.correct_answer_id = None;
        self.is_answered = false;
        self.answer_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Country;
    use proptest::prelude::*;

    fn question(answer_id: u32) -> Question {
        Question {
            answer_id,
            countries: vec![
                Country { country_name: "Right".into(), id: answer_id },
                Country { country_name: "Wrong".into(), id: answer_id + 1 },
            ],
            country_code: "NZ".into(),
        }
    }

    fn quiz(count: u32) -> QuizSnapshot {
        QuizSnapshot::fresh((0..count).map(|i| question(i * 10)).collect(), QuizTiming::default())
    }

    #[test]
    fn recompute_lands_in_interval_of_first_question_after_35_seconds() {
        let timing = QuizTiming::new(30, 10);
        let position = timing.position_at(35, 2);
        assert_eq!(position, QuizPosition::Interval { index: 0, remaining: 5 });

        let mut snapshot = quiz(2);
        assert!(snapshot.apply_position(position));
        assert_eq!(snapshot.phase(), QuizPhase::Interval);
        assert_eq!(snapshot.question_number(), 1);
        assert_eq!(snapshot.interval_timer, 5);
        assert_eq!(snapshot.question_timer, 0);
    }

    #[test]
    fn recompute_past_the_last_period_completes() {
        let timing = QuizTiming::new(30, 10);
        assert_eq!(timing.position_at(80, 2), QuizPosition::Complete);
        assert_eq!(
            timing.position_at(79, 2),
            QuizPosition::Interval { index: 1, remaining: 1 }
        );
        assert_eq!(timing.position_at(0, 0), QuizPosition::Complete);
    }

    #[test]
    fn answering_caps_timer_and_enters_interval_once() {
        let mut snapshot = quiz(2);
        for _ in 0..12 {
            snapshot.tick();
        }
        assert_eq!(snapshot.question_timer, 18);

        let outcome = snapshot.select_answer(0, Utc::now());
        assert_eq!(
            outcome,
            AnswerOutcome::Recorded { correct: true, skipped_secs: 18 }
        );
        assert_eq!(snapshot.question_timer, 0);
        assert_eq!(snapshot.phase(), QuizPhase::Interval);
        assert_eq!(snapshot.interval_timer, 10);
        assert_eq!(snapshot.correct_answer_id, Some(0));
        assert!(snapshot.is_consistent());

        assert_eq!(
            snapshot.select_answer(0, Utc::now()),
            AnswerOutcome::Ignored(IgnoreReason::AlreadyAnswered)
        );
        assert_eq!(snapshot.correct_answers, 1);
    }

    #[test]
    fn wrong_answer_does_not_score() {
        let mut snapshot = quiz(1);
        let outcome = snapshot.select_answer(1, Utc::now());
        assert_eq!(
            outcome,
            AnswerOutcome::Recorded { correct: false, skipped_secs: 30 }
        );
        assert_eq!(snapshot.correct_answers, 0);
        assert_eq!(snapshot.selected_answer_id, Some(1));
        assert_eq!(snapshot.correct_answer_id, Some(0));
    }

    #[test]
    fn answers_after_timeout_are_ignored() {
        let mut snapshot = quiz(2);
        for _ in 0..30 {
            snapshot.tick();
        }
        assert_eq!(snapshot.phase(), QuizPhase::Interval);
        assert_eq!(
            snapshot.select_answer(0, Utc::now()),
            AnswerOutcome::Ignored(IgnoreReason::QuestionClosed)
        );
        assert_eq!(snapshot.correct_answers, 0);
    }

    #[test]
    fn answering_without_questions_is_ignored() {
        let mut snapshot = QuizSnapshot::default();
        assert_eq!(snapshot.phase(), QuizPhase::Loading);
        assert_eq!(
            snapshot.select_answer(3, Utc::now()),
            AnswerOutcome::Ignored(IgnoreReason::NoQuestion)
        );
        assert_eq!(snapshot.tick(), Transition::Idle);
    }

    #[test]
    fn interval_end_advances_and_clears_answer() {
        let mut snapshot = quiz(2);
        snapshot.select_answer(0, Utc::now());
        for _ in 0..9 {
            assert_eq!(snapshot.tick(), Transition::Counted);
        }
        assert_eq!(snapshot.tick(), Transition::Advanced);
        assert_eq!(snapshot.current_question_index, 1);
        assert_eq!(snapshot.phase(), QuizPhase::Question);
        assert_eq!(snapshot.question_timer, 30);
        assert!(!snapshot.is_answered);
        assert_eq!(snapshot.selected_answer_id, None);
        assert_eq!(snapshot.answer_time, None);
    }

    #[test]
    fn last_interval_completes_and_stays_complete() {
        let mut snapshot = quiz(1);
        snapshot.select_answer(0, Utc::now());
        let mut last = Transition::Idle;
        for _ in 0..10 {
            last = snapshot.tick();
        }
        assert_eq!(last, Transition::Completed);
        assert_eq!(snapshot.phase(), QuizPhase::Complete);
        assert!(snapshot.current_question().is_none());

        for _ in 0..100 {
            assert_eq!(snapshot.tick(), Transition::Idle);
        }
        assert!(!snapshot.apply_position(QuizPosition::Question { index: 0, remaining: 30 }));
        assert_eq!(snapshot.phase(), QuizPhase::Complete);
        assert_eq!(
            snapshot.select_answer(0, Utc::now()),
            AnswerOutcome::Ignored(IgnoreReason::QuizComplete)
        );
        assert_eq!(snapshot.score(), ScoreSummary::new(1, 1));
    }

    #[test]
    fn recompute_keeps_answer_on_same_question_and_clears_on_next() {
        let mut snapshot = quiz(3);
        snapshot.select_answer(0, Utc::now());

        snapshot.apply_position(QuizPosition::Interval { index: 0, remaining: 4 });
        assert!(snapshot.is_answered_at(0));
        assert_eq!(snapshot.interval_timer, 4);

        snapshot.apply_position(QuizPosition::Question { index: 2, remaining: 12 });
        assert_eq!(snapshot.current_question_index, 2);
        assert!(!snapshot.is_answered);
        assert_eq!(snapshot.question_timer, 12);
        assert_eq!(snapshot.correct_answers, 1);
    }

    #[test]
    fn recompute_never_moves_backwards() {
        let mut snapshot = quiz(3);
        snapshot.apply_position(QuizPosition::Question { index: 2, remaining: 5 });
        assert!(!snapshot.apply_position(QuizPosition::Question { index: 1, remaining: 30 }));
        assert_eq!(snapshot.current_question_index, 2);
    }

    #[test]
    fn recompute_is_idempotent() {
        let timing = QuizTiming::default();
        let mut snapshot = quiz(4);
        assert!(snapshot.apply_position(timing.position_at(95, 4)));
        let once = snapshot.clone();
        assert!(!snapshot.apply_position(timing.position_at(95, 4)));
        assert_eq!(snapshot, once);
    }

    #[test]
    fn consistency_rejects_out_of_range_index() {
        let mut snapshot = quiz(2);
        assert!(snapshot.is_consistent());
        snapshot.current_question_index = 2;
        assert!(!snapshot.is_consistent());

        let mut answered = quiz(2);
        answered.is_answered = true;
        assert!(!answered.is_consistent());

        let mut miscounted = quiz(2);
        miscounted.total_questions = 5;
        assert!(!miscounted.is_consistent());

        let mut zero_timing = quiz(2);
        zero_timing.timing = QuizTiming {
            question_secs: 0,
            interval_secs: 0,
        };
        zero_timing.question_timer = 0;
        zero_timing.interval_timer = 0;
        assert!(!zero_timing.is_consistent());
    }

    #[test]
    fn timing_floors_durations_at_one_second() {
        let timing = QuizTiming::new(0, 0);
        assert_eq!(timing.question_secs, 1);
        assert_eq!(timing.interval_secs, 1);
        assert_eq!(timing.period_secs(), 2);
    }

    proptest! {
        #[test]
        fn recompute_matches_tick_simulation(
            count in 1u32..5,
            question_secs in 1u32..8,
            interval_secs in 1u32..5,
            extra in 0u64..20,
            fraction in 0.0f64..1.0,
        ) {
            let timing = QuizTiming::new(question_secs, interval_secs);
            let total = timing.period_secs() * u64::from(count) + extra;
            let elapsed = (total as f64 * fraction) as u64;
            let questions: Vec<Question> = (0..count).map(|i| question(i * 10)).collect();

            let mut simulated = QuizSnapshot::fresh(questions.clone(), timing);
            for _ in 0..elapsed {
                simulated.tick();
            }

            let mut recomputed = QuizSnapshot::fresh(questions, timing);
            recomputed.apply_position(timing.position_at(elapsed, count as usize));

            prop_assert_eq!(recomputed.current_question_index, simulated.current_question_index);
            prop_assert_eq!(recomputed.phase(), simulated.phase());
            prop_assert_eq!(recomputed.question_timer, simulated.question_timer);
            prop_assert_eq!(recomputed.interval_timer, simulated.interval_timer);
        }
    }
}
