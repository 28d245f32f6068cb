use url::Url;

use crate::api::quiz::{OptionId, QuestionId};

/// Error type for quiz and collaborator operations.
///
/// Missing answers and content rejections are not errors; they are reported
/// through [`SubmitOutcome`](crate::runner::SubmitOutcome).
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    /// Transport or non-success status from the skills API.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("Base url '{0}' cannot carry path segments")]
    BaseUrl(Url),

    #[error("Quiz has no question {0}")]
    UnknownQuestion(QuestionId),

    #[error("Question {question} has no answer option {option}")]
    UnknownOption {
        question: QuestionId,
        option: OptionId,
    },

    /// A text answer was given to a multiple-choice question or the other way round.
    #[error("Question {0} does not accept this kind of answer")]
    AnswerKind(QuestionId),

    #[error("Attempt is already completed")]
    AttemptClosed,

    #[error("Video settings are not valid: {0}")]
    InvalidVideoSettings(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by a non-HTTP collaborator.
    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl QuizError {
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::AttemptClosed)
    }
}
