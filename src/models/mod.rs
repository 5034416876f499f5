pub mod question;

pub use question::{Country, Question, QuizData};
