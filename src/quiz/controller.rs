use std::{ops::ControlFlow, sync::Arc, time::Duration};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};

use crate::{db::QuizResult, models::Question, store::QuizStore};

use super::{
    AnswerOutcome, QuizPosition, QuizSnapshot, QuizTiming, ScoreSummary, Ticker, Transition,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Owns the quiz snapshot and the one-second ticker driving it.
///
/// All mutation goes through the single `state` mutex and every mutation is
/// written through to the store before it is published to subscribers.
/// Store failures are logged and otherwise ignored.
#[derive(Clone)]
pub struct QuizController {
    state: Arc<Mutex<QuizSnapshot>>,
    store: Arc<dyn QuizStore>,
    ticker: Arc<Mutex<Ticker>>,
    updates: Arc<watch::Sender<QuizSnapshot>>,
    timing: QuizTiming,
    tick_interval: Duration,
}

impl QuizController {
    pub fn new(store: Arc<dyn QuizStore>, timing: QuizTiming) -> Self {
        let (updates, _) = watch::channel(QuizSnapshot::default());

        Self {
            state: Arc::new(Mutex::new(QuizSnapshot::default())),
            store,
            ticker: Arc::new(Mutex::new(Ticker::new())),
            updates: Arc::new(updates),
            timing,
            tick_interval: Duration::from_secs(1),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QuizSnapshot> {
        self.updates.subscribe()
    }

    pub async fn snapshot(&self) -> QuizSnapshot {
        self.state.lock().await.clone()
    }

    pub async fn score(&self) -> ScoreSummary {
        self.state.lock().await.score()
    }

    pub async fn is_running(&self) -> bool {
        self.ticker.lock().await.is_running()
    }

    pub async fn initialize(&self, questions: Vec<Question>) -> QuizSnapshot {
        self.initialize_at(questions, Utc::now()).await
    }

    /// Restore the stored attempt, recomputed for `now`, or begin a new one on
    /// the first question. A stored attempt that already finished is recorded
    /// and replaced. An empty question bank leaves the quiz empty.
    pub async fn initialize_at(&self, questions: Vec<Question>, now: DateTime<Utc>) -> QuizSnapshot {
        self.stop().await;

        if questions.is_empty() {
            log_warn!("No questions available; quiz stays empty");
            let mut guard = self.state.lock().await;
            *guard = QuizSnapshot::default();
            self.updates.send_replace(guard.clone());
            return guard.clone();
        }

        let saved = match self.store.load_quiz_state().await {
            Ok(saved) => saved,
            Err(err) => {
                log_warn!("Failed to load quiz state: {err:#}");
                None
            }
        };

        if let Some(finished) = saved.as_ref().filter(|s| s.is_quiz_complete) {
            log_info!("Previous quiz attempt already finished; starting a new one");
            self.finish(finished, now).await;
        }

        let mut guard = self.state.lock().await;
        match saved {
            Some(saved) if !saved.questions.is_empty() && !saved.is_quiz_complete => {
                log_info!(
                    "Restoring quiz attempt {} at question {}",
                    saved.attempt_id.as_deref().unwrap_or("<unknown>"),
                    saved.question_number()
                );
                *guard = saved;
                self.recompute(&mut guard, now).await;
            }
            _ => {
                // Drop any start timestamp left behind by a discarded attempt.
                if let Err(err) = self.store.clear_quiz_state().await {
                    log_warn!("Failed to clear stale quiz state: {err:#}");
                }
                *guard = QuizSnapshot::fresh(questions, self.timing);
                log_info!(
                    "Starting quiz attempt {} with {} questions",
                    guard.attempt_id.as_deref().unwrap_or("<unknown>"),
                    guard.total_questions
                );
            }
        }

        self.commit(&guard).await;
        let snapshot = guard.clone();
        drop(guard);

        if snapshot.is_quiz_complete {
            self.finish(&snapshot, now).await;
        }
        snapshot
    }

    pub async fn start(&self) -> Result<QuizSnapshot> {
        self.start_at(Utc::now()).await
    }

    /// Stamp the attempt's start time (first start only) and run the ticker.
    pub async fn start_at(&self, now: DateTime<Utc>) -> Result<QuizSnapshot> {
        {
            let guard = self.state.lock().await;
            if guard.questions.is_empty() {
                bail!("no questions loaded");
            }
            if guard.is_quiz_complete {
                bail!("quiz already complete");
            }
        }

        if self.start_time().await.is_none() {
            log_info!("Quiz started at {}", now.to_rfc3339());
            if let Err(err) = self.store.set_quiz_start_time(now).await {
                log_warn!("Failed to persist quiz start time: {err:#}");
            }
        }

        self.spawn_ticker().await?;
        Ok(self.snapshot().await)
    }

    pub async fn select_answer(&self, answer_id: u32) -> AnswerOutcome {
        self.select_answer_at(answer_id, Utc::now()).await
    }

    pub async fn select_answer_at(&self, answer_id: u32, now: DateTime<Utc>) -> AnswerOutcome {
        let mut guard = self.state.lock().await;
        let outcome = guard.select_answer(answer_id, now);

        match outcome {
            AnswerOutcome::Recorded {
                correct,
                skipped_secs,
            } => {
                log_info!(
                    "Question {} answered {} ({}s early)",
                    guard.question_number(),
                    if correct { "correctly" } else { "incorrectly" },
                    skipped_secs
                );
                // Skipping the rest of the question phase moves the whole
                // schedule earlier so elapsed-time recompute agrees with ticking.
                if let Some(started_at) = self.start_time().await {
                    let skip = unused_question_secs(&guard, started_at, now, skipped_secs);
                    if skip > 0 {
                        self.shift_start_time(started_at, skip).await;
                    }
                }
                self.commit(&guard).await;
            }
            AnswerOutcome::Ignored(reason) => {
                log_debug!("Ignoring answer {answer_id}: {reason:?}");
            }
        }

        outcome
    }

    pub async fn resume(&self) -> QuizSnapshot {
        self.resume_at(Utc::now()).await
    }

    /// Recompute the snapshot from elapsed wall-clock time after the app was
    /// backgrounded, then restart the ticker if the quiz is still running.
    /// Safe to call any number of times.
    pub async fn resume_at(&self, now: DateTime<Utc>) -> QuizSnapshot {
        self.stop().await;

        let mut guard = self.state.lock().await;
        if guard.questions.is_empty() {
            return guard.clone();
        }

        if self.recompute(&mut guard, now).await {
            log_info!(
                "Resumed at question {} ({:?})",
                guard.question_number(),
                guard.phase()
            );
        }
        self.commit(&guard).await;
        let snapshot = guard.clone();
        drop(guard);

        if snapshot.is_quiz_complete {
            self.finish(&snapshot, now).await;
        } else if self.start_time().await.is_some() {
            if let Err(err) = self.spawn_ticker().await {
                log_error!("Failed to restart quiz ticker: {err:#}");
            }
        }

        snapshot
    }

    /// Cancel the ticker, leaving the snapshot as it is.
    pub async fn stop(&self) {
        if let Err(err) = self.ticker.lock().await.stop().await {
            log_warn!("Quiz ticker did not stop cleanly: {err:#}");
        }
    }

    /// Cancel the ticker and forget the current attempt entirely.
    pub async fn reset(&self) {
        self.stop().await;

        if let Err(err) = self.store.clear_quiz_state().await {
            log_warn!("Failed to clear quiz state: {err:#}");
        }

        let mut guard = self.state.lock().await;
        *guard = QuizSnapshot::default();
        self.updates.send_replace(guard.clone());
    }

    async fn spawn_ticker(&self) -> Result<()> {
        let controller = self.clone();
        self.ticker
            .lock()
            .await
            .restart(self.tick_interval, move || {
                let controller = controller.clone();
                async move { controller.tick_once().await }
            })
            .await
    }

    async fn tick_once(&self) -> ControlFlow<()> {
        let mut guard = self.state.lock().await;
        let transition = guard.tick();

        match transition {
            Transition::Idle => return ControlFlow::Break(()),
            Transition::Counted => {}
            Transition::IntervalStarted => {
                log_debug!("Question {} closed", guard.question_number());
            }
            Transition::Advanced => {
                log_info!(
                    "Question {} of {}",
                    guard.question_number(),
                    guard.total_questions
                );
            }
            Transition::Completed => {
                self.commit(&guard).await;
                let snapshot = guard.clone();
                drop(guard);
                self.finish(&snapshot, Utc::now()).await;
                return ControlFlow::Break(());
            }
        }

        self.commit(&guard).await;
        ControlFlow::Continue(())
    }

    /// Move `snapshot` to where the elapsed time since the start timestamp says
    /// it should be. Returns whether anything changed.
    async fn recompute(&self, snapshot: &mut QuizSnapshot, now: DateTime<Utc>) -> bool {
        if snapshot.is_quiz_complete || snapshot.questions.is_empty() {
            return false;
        }
        let Some(started_at) = self.start_time().await else {
            return false;
        };

        let elapsed = (now - started_at).num_seconds().max(0) as u64;
        let count = snapshot.questions.len();
        let mut position = snapshot.timing.position_at(elapsed, count);

        // An answer whose schedule shift never reached the store.
        if let QuizPosition::Question { index, remaining } = position {
            if snapshot.is_answered_at(index) {
                self.shift_start_time(started_at, remaining).await;
                position = snapshot
                    .timing
                    .position_at(elapsed + u64::from(remaining), count);
            }
        }

        snapshot.apply_position(position)
    }

    async fn finish(&self, snapshot: &QuizSnapshot, finished_at: DateTime<Utc>) {
        let score = snapshot.score();
        let Some(attempt_id) = snapshot.attempt_id.clone() else {
            log_info!("Quiz complete: {score}");
            return;
        };

        let result = QuizResult {
            attempt_id,
            correct: score.correct,
            total: score.total,
            finished_at,
        };

        match self.store.record_quiz_result(&result).await {
            Ok(true) => log_info!("Quiz {} complete: {score}", result.attempt_id),
            Ok(false) => {}
            Err(err) => log_warn!("Failed to record quiz result: {err:#}"),
        }
    }

    async fn commit(&self, snapshot: &QuizSnapshot) {
        if let Err(err) = self.store.save_quiz_state(snapshot).await {
            log_warn!("Failed to persist quiz state: {err:#}");
        }
        self.updates.send_replace(snapshot.clone());
    }

    async fn start_time(&self) -> Option<DateTime<Utc>> {
        match self.store.quiz_start_time().await {
            Ok(started_at) => started_at,
            Err(err) => {
                log_warn!("Failed to read quiz start time: {err:#}");
                None
            }
        }
    }

    async fn shift_start_time(&self, started_at: DateTime<Utc>, secs: u32) {
        let shifted = started_at - chrono::Duration::seconds(i64::from(secs));
        if let Err(err) = self.store.set_quiz_start_time(shifted).await {
            log_warn!("Failed to shift quiz start time: {err:#}");
        }
    }
}

/// Question time left when answering at `now`, measured on the wall clock.
/// Falls back to the ticked timer when the clock disagrees about which
/// question is current.
fn unused_question_secs(
    snapshot: &QuizSnapshot,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
    ticked_secs: u32,
) -> u32 {
    let elapsed = (now - started_at).num_seconds().max(0) as u64;
    match snapshot.timing.position_at(elapsed, snapshot.questions.len()) {
        QuizPosition::Question { index, remaining } if index == snapshot.current_question_index => {
            remaining
        }
        QuizPosition::Interval { index, .. } if index == snapshot.current_question_index => 0,
        _ => ticked_secs,
    }
}
