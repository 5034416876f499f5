pub mod controller;
pub mod score;
pub mod state;
pub mod ticker;

pub use controller::QuizController;
pub use score::ScoreSummary;
pub use state::{
    AnswerOutcome, IgnoreReason, QuizPhase, QuizPosition, QuizSnapshot, QuizTiming, Transition,
};
pub use ticker::Ticker;
