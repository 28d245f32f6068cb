use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};
use tracing::instrument;

use crate::api::connection::{AttemptSubmission, RecordAttempt, RetrieveQuiz, ValidateContent};
use crate::api::quiz::{OptionId, QuestionId, QuestionType, Quiz};
use crate::config::Settings;
use crate::error::QuizError;
use crate::grading::{grade_question, QuestionGrade};
use crate::state::{AggregateIssue, Answer, AttemptPhase, AttemptState, CheckResult, TextCheck};
use crate::validator::{validate_question, ContentCheck, UNAVAILABLE_MESSAGE};

#[derive(Debug, Clone, Copy)]
pub struct RunnerSettings {
    /// Quiet period after the last keystroke before a text answer is checked.
    pub debounce: Duration,
    pub validation_timeout: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            validation_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Settings> for RunnerSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            debounce: settings.validation_debounce,
            validation_timeout: settings.validation_timeout,
        }
    }
}

pub enum StartOutcome<B> {
    Ready(QuizRunner<B>),
    /// The backend reports the user already finished this quiz; nothing is editable.
    AlreadyCompleted(Quiz),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed {
        points: u32,
        grades: Vec<QuestionGrade>,
    },
    Rejected {
        aggregate: AggregateIssue,
        /// Questions still carrying an issue.
        questions: Vec<QuestionId>,
    },
}

#[derive(Debug)]
struct CheckOutcome {
    question: QuestionId,
    seq: u64,
    result: CheckResult,
}

/// Must be used from within a Tokio runtime. Dropping the runner aborts any
/// in-flight checks without telling the backend.
pub struct QuizRunner<B> {
    backend: Arc<B>,
    quiz: Quiz,
    state: AttemptState,
    checker: ContentCheck<B>,
    settings: RunnerSettings,
    debounced: HashMap<QuestionId, AbortHandle>,
    next_seq: u64,
    outcomes_tx: mpsc::UnboundedSender<CheckOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<CheckOutcome>,
}

impl<B> QuizRunner<B>
where
    B: RetrieveQuiz + RecordAttempt + ValidateContent + Send + Sync + 'static,
{
    #[instrument(level = "info", skip(backend, settings))]
    pub async fn start(
        backend: Arc<B>,
        quiz_id: &str,
        settings: RunnerSettings,
    ) -> Result<StartOutcome<B>, QuizError> {
        let quiz = backend.retrieve_quiz(quiz_id).await?;

        if quiz.already_completed() {
            log::info!("Quiz '{}' was already completed by this user", quiz.id());
            return Ok(StartOutcome::AlreadyCompleted(quiz));
        }

        log::info!(
            "Starting attempt on '{}' with {} questions",
            quiz.id(),
            quiz.questions().len()
        );
        Ok(StartOutcome::Ready(Self::new(backend, quiz, settings)))
    }
}

impl<B> QuizRunner<B>
where
    B: RecordAttempt + ValidateContent + Send + Sync + 'static,
{
    pub fn new(backend: Arc<B>, quiz: Quiz, settings: RunnerSettings) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let checker = ContentCheck::new(Arc::clone(&backend), settings.validation_timeout);

        let mut runner = Self {
            backend,
            quiz,
            state: AttemptState::new(),
            checker,
            settings,
            debounced: HashMap::new(),
            next_seq: 0,
            outcomes_tx,
            outcomes_rx,
        };
        runner.revalidate();
        runner
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    /// Multi-select questions toggle `option`; single-select ones replace the choice.
    pub fn select_option(&mut self, question: QuestionId, option: OptionId) -> Result<(), QuizError> {
        self.ensure_open()?;

        let definition = self
            .quiz
            .question(question)
            .ok_or(QuizError::UnknownQuestion(question))?;
        if definition.question_type() != QuestionType::MultipleChoice {
            return Err(QuizError::AnswerKind(question));
        }
        if definition.option(option).is_none() {
            return Err(QuizError::UnknownOption { question, option });
        }
        let multi_select = definition.is_multi_select();

        let answer = self
            .state
            .answers
            .entry(question)
            .or_insert_with(|| Answer::Selected(BTreeSet::new()));
        if let Answer::Selected(selected) = answer {
            if !multi_select {
                selected.clear();
                selected.insert(option);
            } else if !selected.remove(&option) {
                selected.insert(option);
            }
        }

        log::debug!("Question {} selection changed ({})", question, option);
        self.after_edit();
        Ok(())
    }

    pub fn set_text(&mut self, question: QuestionId, text: impl Into<String>) -> Result<(), QuizError> {
        self.ensure_open()?;

        let definition = self
            .quiz
            .question(question)
            .ok_or(QuizError::UnknownQuestion(question))?;
        if definition.question_type() != QuestionType::TextInput {
            return Err(QuizError::AnswerKind(question));
        }
        let validates = definition.validates_content();

        let text = text.into();
        self.state.answers.insert(question, Answer::Text(text.clone()));
        if validates {
            self.schedule_check(question, text);
        }

        self.after_edit();
        Ok(())
    }

    pub fn clear_answer(&mut self, question: QuestionId) -> Result<(), QuizError> {
        self.ensure_open()?;
        if self.quiz.question(question).is_none() {
            return Err(QuizError::UnknownQuestion(question));
        }

        self.state.answers.remove(&question);
        self.drop_check(question);
        self.after_edit();
        Ok(())
    }

    pub fn poll_checks(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            if self.apply_outcome(outcome) {
                applied += 1;
            }
        }
        if applied > 0 {
            self.revalidate();
        }
        applied
    }

    /// Waits for the next current check result and applies it.
    ///
    /// Cancel safe. Never resolves while no check is in flight.
    pub async fn next_check(&mut self) -> QuestionId {
        loop {
            let Some(outcome) = self.outcomes_rx.recv().await else {
                return std::future::pending().await;
            };
            let question = outcome.question;
            if self.apply_outcome(outcome) {
                self.revalidate();
                return question;
            }
        }
    }

    pub fn has_pending_checks(&self) -> bool {
        self.state.checks.values().any(|check| check.result.is_none())
    }

    pub async fn wait_for_checks(&mut self) {
        while self.has_pending_checks() {
            self.next_check().await;
        }
    }

    /// Answers without a verdict for their current text are re-checked first.
    #[instrument(level = "info", skip_all, fields(quiz = %self.quiz.id(), attempt = %self.state.attempt_id))]
    pub async fn submit(&mut self) -> Result<SubmitOutcome, QuizError> {
        self.ensure_open()?;
        self.state.phase = AttemptPhase::Submitting;

        self.poll_checks();
        self.force_unsettled_checks().await;
        self.revalidate();

        if let Some(aggregate) = self.state.aggregate_issue() {
            let questions = self.state.questions_with_issues();
            log::info!("Submission rejected: {} {:?}", aggregate, questions);
            self.state.phase = AttemptPhase::Rejected(aggregate.clone());
            return Ok(SubmitOutcome::Rejected {
                aggregate,
                questions,
            });
        }

        let submission = AttemptSubmission {
            attempt_id: self.state.attempt_id,
            answers: self.state.submitted_answers(),
        };

        match self.backend.complete_attempt(self.quiz.id(), &submission).await {
            Ok(report) => {
                let points = if report.passed {
                    self.quiz.point_increment()
                } else {
                    0
                };
                let grades: Vec<QuestionGrade> = if self.quiz.is_survey() {
                    vec![]
                } else {
                    self.quiz
                        .questions()
                        .iter()
                        .filter_map(|q| grade_question(q, self.state.answers.get(&q.id())))
                        .collect()
                };

                self.abort_checks();
                self.state.phase = AttemptPhase::Completed {
                    points,
                    grades: grades.clone(),
                };
                log::info!("Attempt completed, {} points awarded", points);
                Ok(SubmitOutcome::Completed { points, grades })
            }
            Err(e) => {
                log::error!("Failed to complete attempt: {}", e);
                let aggregate = AggregateIssue::SubmissionFailed(e.to_string());
                self.state.phase = AttemptPhase::Rejected(aggregate.clone());
                Ok(SubmitOutcome::Rejected {
                    aggregate,
                    questions: vec![],
                })
            }
        }
    }

    pub fn cancel(self) {
        log::info!(
            "Attempt {} on '{}' cancelled",
            self.state.attempt_id,
            self.quiz.id()
        );
    }

    fn ensure_open(&self) -> Result<(), QuizError> {
        if self.state.is_submitted() {
            return Err(QuizError::AttemptClosed);
        }
        Ok(())
    }

    fn after_edit(&mut self) {
        self.state.phase = AttemptPhase::InProgress;
        self.revalidate();
    }

    fn revalidate(&mut self) {
        let state = &self.state;
        let issues: BTreeMap<_, _> = self
            .quiz
            .questions()
            .iter()
            .map(|question| {
                let id = question.id();
                (
                    id,
                    validate_question(question, state.answers.get(&id), state.checks.get(&id)),
                )
            })
            .collect();
        self.state.issues = issues;
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn drop_check(&mut self, question: QuestionId) {
        if let Some(handle) = self.debounced.remove(&question) {
            handle.abort();
        }
        self.state.checks.remove(&question);
    }

    fn abort_checks(&mut self) {
        for (_, handle) in self.debounced.drain() {
            handle.abort();
        }
    }

    fn schedule_check(&mut self, question: QuestionId, text: String) {
        self.drop_check(question);
        if text.trim().is_empty() {
            return;
        }

        let seq = self.bump_seq();
        if let Some(result) = self.checker.cached(&text) {
            self.state.checks.insert(
                question,
                TextCheck {
                    seq,
                    text,
                    result: Some(result),
                },
            );
            return;
        }

        self.state.checks.insert(
            question,
            TextCheck {
                seq,
                text: text.clone(),
                result: None,
            },
        );

        let checker = self.checker.clone();
        let outcomes = self.outcomes_tx.clone();
        let debounce = self.settings.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let result = checker.check(&text).await;
            // The runner may be gone; its checks no longer matter.
            let _ = outcomes.send(CheckOutcome {
                question,
                seq,
                result,
            });
        });
        self.debounced.insert(question, handle.abort_handle());
    }

    fn apply_outcome(&mut self, outcome: CheckOutcome) -> bool {
        match self.state.checks.get_mut(&outcome.question) {
            Some(check) if check.seq == outcome.seq => {
                log::debug!(
                    "Check {} for question {} resolved: {:?}",
                    outcome.seq,
                    outcome.question,
                    outcome.result
                );
                check.result = Some(outcome.result);
                self.debounced.remove(&outcome.question);
                true
            }
            _ => {
                log::debug!(
                    "Discarding stale check {} for question {}",
                    outcome.seq,
                    outcome.question
                );
                false
            }
        }
    }

    async fn force_unsettled_checks(&mut self) {
        let unsettled: Vec<(QuestionId, String)> = self
            .quiz
            .questions()
            .iter()
            .filter(|question| question.validates_content())
            .filter_map(|question| {
                let text = self.state.answers.get(&question.id())?.as_text()?;
                if text.trim().is_empty() {
                    return None;
                }
                let settled = self
                    .state
                    .checks
                    .get(&question.id())
                    .is_some_and(|check| check.is_settled_for(text));
                (!settled).then(|| (question.id(), text.to_string()))
            })
            .collect();

        if unsettled.is_empty() {
            return;
        }

        let mut forced = JoinSet::new();
        for (question, text) in unsettled {
            if let Some(handle) = self.debounced.remove(&question) {
                handle.abort();
            }
            let seq = self.bump_seq();
            log::debug!("Forcing check {} for question {}", seq, question);
            self.state.checks.insert(
                question,
                TextCheck {
                    seq,
                    text: text.clone(),
                    result: None,
                },
            );

            let checker = self.checker.clone();
            forced.spawn(async move {
                let result = checker.check(&text).await;
                CheckOutcome {
                    question,
                    seq,
                    result,
                }
            });
        }

        while let Some(joined) = forced.join_next().await {
            match joined {
                Ok(outcome) => {
                    self.apply_outcome(outcome);
                }
                Err(e) => log::error!("Forced content check did not finish: {}", e),
            }
        }

        for check in self.state.checks.values_mut() {
            if check.result.is_none() {
                check.result = Some(CheckResult::Unavailable(UNAVAILABLE_MESSAGE.into()));
            }
        }
    }
}

impl<B> Drop for QuizRunner<B> {
    fn drop(&mut self) {
        for (_, handle) in self.debounced.drain() {
            handle.abort();
        }
    }
}
