pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod grading;
pub mod render;
pub mod runner;
pub mod state;
pub mod test_backend;
pub mod validator;
pub mod video;

pub use api::connection::Connection;
pub use api::quiz::{AnswerOption, Question, QuestionType, Quiz, QuizType};
pub use config::Settings;
pub use error::QuizError;
pub use runner::{QuizRunner, RunnerSettings, StartOutcome, SubmitOutcome};
pub use state::{AggregateIssue, Answer, AttemptPhase, Issue};
pub use test_backend::TestBackend;
pub use video::{VideoAttrs, VideoSettingsForm};

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;
