//! Line-oriented front end: prints quiz state as it changes and reads answer
//! ids from stdin.

use anyhow::Result;
use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    db::Database,
    models::Question,
    quiz::{AnswerOutcome, IgnoreReason, QuizController, QuizPhase, QuizSnapshot},
    schedule::{ChallengeScheduler, ChallengeStatus, Countdown, ScheduledTime},
    settings::QuizSettings,
};

const RECENT_RESULTS: usize = 5;

pub(crate) async fn run_session(
    controller: &QuizController,
    database: &Database,
    settings: &QuizSettings,
    questions: Vec<Question>,
    schedule: Option<ScheduledTime>,
) -> Result<()> {
    let resuming = database.is_quiz_active().await.unwrap_or(false);
    if resuming {
        println!("Resuming the quiz in progress.");
    } else {
        if let Some(time) = schedule {
            wait_for_challenge(time, settings.pre_countdown_secs).await?;
        }
        Countdown::new(settings.countdown_secs)
            .run(|secs| {
                if secs > 0 {
                    println!("Starting in {secs}...");
                }
            })
            .await;
    }

    let snapshot = controller.initialize(questions).await;
    if snapshot.phase() == QuizPhase::Loading {
        println!("No questions available.");
        return Ok(());
    }
    if !snapshot.is_quiz_complete {
        controller.start().await?;
    }

    let mut updates = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut screen = Screen::default();

    loop {
        let snapshot = updates.borrow_and_update().clone();
        screen.render(&snapshot);
        if snapshot.is_quiz_complete {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_input(controller, &line).await,
                Ok(None) => stdin_open = false,
                Err(err) => {
                    warn!("Failed to read answer: {err}");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                controller.stop().await;
                println!("\nPaused. Run again to pick up where you left off.");
                return Ok(());
            }
        }
    }

    println!("\nGame over! {}", controller.score().await);
    match database.list_quiz_results(RECENT_RESULTS).await {
        Ok(results) if results.len() > 1 => {
            println!("Recent results:");
            for result in results {
                println!(
                    "  {}  {}",
                    result.finished_at.format("%Y-%m-%d %H:%M"),
                    result.score()
                );
            }
        }
        Ok(_) => {}
        Err(err) => warn!("Failed to load past results: {err:#}"),
    }

    controller.reset().await;
    Ok(())
}

async fn wait_for_challenge(time: ScheduledTime, pre_countdown_secs: u32) -> Result<()> {
    let mut scheduler = ChallengeScheduler::new(pre_countdown_secs);
    let mut status = scheduler.schedule(time).await?;
    if let Some(at) = scheduler.scheduled_for() {
        println!("Challenge scheduled for {}", at.format("%Y-%m-%d %H:%M:%S"));
    }

    loop {
        let current = *status.borrow_and_update();
        match current {
            ChallengeStatus::Waiting { seconds_until } if seconds_until % 60 == 0 => {
                println!("Challenge starts in {}", format_clock(seconds_until));
            }
            ChallengeStatus::Waiting { .. } => {}
            ChallengeStatus::PreCountdown { seconds } => {
                println!("Get ready: {seconds}s");
            }
            ChallengeStatus::Started => return Ok(()),
        }

        if status.changed().await.is_err() {
            return Ok(());
        }
    }
}

async fn handle_input(controller: &QuizController, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let Ok(answer_id) = line.parse::<u32>() else {
        println!("Type the number shown next to your answer.");
        return;
    };

    match controller.select_answer(answer_id).await {
        AnswerOutcome::Recorded { .. } => {}
        AnswerOutcome::Ignored(IgnoreReason::AlreadyAnswered) => {
            println!("You already answered this one.");
        }
        AnswerOutcome::Ignored(IgnoreReason::QuestionClosed) => {
            println!("Too late for this question.");
        }
        AnswerOutcome::Ignored(IgnoreReason::NoQuestion | IgnoreReason::QuizComplete) => {}
    }
}

fn format_clock(total_secs: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60
    )
}

/// Tracks what has been printed so each snapshot only prints what changed.
#[derive(Default)]
struct Screen {
    shown: Option<(usize, QuizPhase)>,
    last_timer: Option<u32>,
}

impl Screen {
    fn render(&mut self, snapshot: &QuizSnapshot) {
        let key = (snapshot.current_question_index, snapshot.phase());
        let fresh = self.shown != Some(key);
        self.shown = Some(key);

        match key.1 {
            QuizPhase::Loading => {}
            QuizPhase::Question => {
                let Some(question) = snapshot.current_question() else {
                    return;
                };
                if fresh {
                    self.last_timer = None;
                    print_question(snapshot, question);
                }
                let timer = snapshot.question_timer;
                if self.last_timer != Some(timer) && (timer == 10 || timer <= 5) {
                    println!("  {timer}s left");
                }
                self.last_timer = Some(timer);
            }
            QuizPhase::Interval if fresh => {
                print_verdict(snapshot);
                if snapshot.question_number() < snapshot.questions.len() {
                    println!("Next question in {}s", snapshot.interval_timer);
                }
            }
            QuizPhase::Interval => {}
            QuizPhase::Complete if fresh => println!("Quiz complete."),
            QuizPhase::Complete => {}
        }
    }
}

fn print_question(snapshot: &QuizSnapshot, question: &Question) {
    println!(
        "\nQuestion {}/{}  {}  ({}s)",
        snapshot.question_number(),
        snapshot.total_questions,
        question
            .flag_emoji()
            .unwrap_or_else(|| question.country_code.clone()),
        snapshot.question_timer
    );
    for country in &question.countries {
        println!("  [{}] {}", country.id, country.country_name);
    }
}

fn print_verdict(snapshot: &QuizSnapshot) {
    let answer = snapshot
        .current_question()
        .and_then(Question::correct_country)
        .map(|c| c.country_name.as_str())
        .unwrap_or("unknown");

    if !snapshot.is_answered {
        println!("Time's up! It was {answer}.");
    } else if snapshot.selected_answer_id == snapshot.correct_answer_id {
        println!(
            "Correct! Score: {}/{}",
            snapshot.correct_answers, snapshot.total_questions
        );
    } else {
        println!(
            "Wrong, it was {answer}. Score: {}/{}",
            snapshot.correct_answers, snapshot.total_questions
        );
    }
}
