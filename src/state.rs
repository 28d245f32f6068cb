use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use uuid::Uuid;

use crate::api::connection::SubmittedAnswer;
use crate::api::quiz::{OptionId, QuestionId};
use crate::grading::QuestionGrade;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Selected(BTreeSet<OptionId>),
    Text(String),
}

impl Answer {
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Selected(options) => options.is_empty(),
            Self::Text(text) => text.trim().is_empty(),
        }
    }

    pub fn selected(&self) -> Option<&BTreeSet<OptionId>> {
        match self {
            Self::Selected(options) => Some(options),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Selected(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    Missing,
    ValidationFailed(String),
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "Answer is required"),
            Self::ValidationFailed(message) => write!(f, "{message}"),
        }
    }
}

/// Banner shown for a rejected submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateIssue {
    MissingAnswers,
    ValidationErrors,
    SubmissionFailed(String),
}

impl fmt::Display for AggregateIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAnswers => write!(f, "Missing answers"),
            Self::ValidationErrors => write!(f, "There are still validation errors."),
            Self::SubmissionFailed(reason) => write!(f, "Failed to complete the attempt: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptPhase {
    InProgress,
    Submitting,
    Rejected(AggregateIssue),
    Completed {
        points: u32,
        grades: Vec<QuestionGrade>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    Passed,
    Rejected(String),
    /// The validation service failed or timed out.
    Unavailable(String),
}

/// Latest content check issued for a text question.
///
/// `result` is `None` while the check with this `seq` is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCheck {
    pub seq: u64,
    pub text: String,
    pub result: Option<CheckResult>,
}

impl TextCheck {
    /// A definitive verdict exists for exactly `text`. Outages don't count.
    pub fn is_settled_for(&self, text: &str) -> bool {
        self.text == text
            && matches!(
                self.result,
                Some(CheckResult::Passed) | Some(CheckResult::Rejected(_))
            )
    }
}

/// One user's pass through a quiz. Owned by a single [`QuizRunner`](crate::runner::QuizRunner).
#[derive(Debug, Clone)]
pub struct AttemptState {
    pub(crate) attempt_id: Uuid,
    pub(crate) answers: BTreeMap<QuestionId, Answer>,
    pub(crate) issues: BTreeMap<QuestionId, Option<Issue>>,
    pub(crate) checks: HashMap<QuestionId, TextCheck>,
    pub(crate) phase: AttemptPhase,
}

impl AttemptState {
    pub(crate) fn new() -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            answers: BTreeMap::new(),
            issues: BTreeMap::new(),
            checks: HashMap::new(),
            phase: AttemptPhase::InProgress,
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn answers(&self) -> &BTreeMap<QuestionId, Answer> {
        &self.answers
    }

    pub fn answer(&self, question: QuestionId) -> Option<&Answer> {
        self.answers.get(&question)
    }

    /// Per-question issues, one entry for every question of the quiz.
    pub fn issues(&self) -> &BTreeMap<QuestionId, Option<Issue>> {
        &self.issues
    }

    pub fn issue(&self, question: QuestionId) -> Option<&Issue> {
        self.issues.get(&question).and_then(Option::as_ref)
    }

    pub fn questions_with_issues(&self) -> Vec<QuestionId> {
        self.issues
            .iter()
            .filter(|(_, issue)| issue.is_some())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn check(&self, question: QuestionId) -> Option<&TextCheck> {
        self.checks.get(&question)
    }

    pub fn phase(&self) -> &AttemptPhase {
        &self.phase
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.phase, AttemptPhase::Completed { .. })
    }

    pub fn aggregate_issue(&self) -> Option<AggregateIssue> {
        let mut any = false;
        for issue in self.issues.values().flatten() {
            if *issue == Issue::Missing {
                return Some(AggregateIssue::MissingAnswers);
            }
            any = true;
        }
        any.then_some(AggregateIssue::ValidationErrors)
    }

    pub(crate) fn submitted_answers(&self) -> Vec<SubmittedAnswer> {
        self.answers
            .iter()
            .map(|(question_id, answer)| match answer {
                Answer::Selected(options) => SubmittedAnswer {
                    question_id: *question_id,
                    selected_option_ids: options.iter().copied().collect(),
                    text: None,
                },
                Answer::Text(text) => SubmittedAnswer {
                    question_id: *question_id,
                    selected_option_ids: vec![],
                    text: Some(text.clone()),
                },
            })
            .collect()
    }
}
