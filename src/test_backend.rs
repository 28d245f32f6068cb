//! In-memory collaborator for exercising quizzes without a skills server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::anyhow;

use crate::api::connection::{
    AttemptSubmission, CompletionReport, ContentVerdict, RecordAttempt, RetrieveQuiz,
    ValidateContent, VideoStore,
};
use crate::api::quiz::Quiz;
use crate::error::QuizError;
use crate::video::VideoAttrs;

#[derive(Debug, Default)]
pub struct TestBackend {
    quizzes: HashMap<String, Quiz>,
    disallowed_terms: Vec<String>,
    validation_delay: Duration,
    failing_validation: AtomicBool,
    failing_submission: bool,
    failed_grading: bool,
    validation_calls: AtomicUsize,
    submissions: Mutex<Vec<AttemptSubmission>>,
    videos: Mutex<HashMap<(String, String), VideoAttrs>>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quiz(mut self, quiz: Quiz) -> Self {
        self.quizzes.insert(quiz.id().to_string(), quiz);
        self
    }

    /// Rejects any text containing `term`, case-insensitively.
    pub fn with_disallowed_term(mut self, term: impl Into<String>) -> Self {
        self.disallowed_terms.push(term.into().to_lowercase());
        self
    }

    pub fn with_validation_delay(mut self, delay: Duration) -> Self {
        self.validation_delay = delay;
        self
    }

    pub fn with_failing_validation(self) -> Self {
        self.set_validation_failing(true);
        self
    }

    /// Takes the validation service down or brings it back.
    pub fn set_validation_failing(&self, failing: bool) {
        self.failing_validation.store(failing, Ordering::SeqCst);
    }

    pub fn with_failing_submission(mut self) -> Self {
        self.failing_submission = true;
        self
    }

    /// Completion reports `passed: false`.
    pub fn with_failed_grading(mut self) -> Self {
        self.failed_grading = true;
        self
    }

    pub fn with_video(self, project_id: &str, skill_id: &str, attrs: VideoAttrs) -> Self {
        self.videos
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((project_id.to_string(), skill_id.to_string()), attrs);
        self
    }

    pub fn validation_calls(&self) -> usize {
        self.validation_calls.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<AttemptSubmission> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stored_video(&self, project_id: &str, skill_id: &str) -> Option<VideoAttrs> {
        self.videos
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(project_id.to_string(), skill_id.to_string()))
            .cloned()
    }
}

impl RetrieveQuiz for TestBackend {
    async fn retrieve_quiz(&self, quiz_id: &str) -> Result<Quiz, QuizError> {
        self.quizzes
            .get(quiz_id)
            .cloned()
            .ok_or_else(|| QuizError::backend(anyhow!("Quiz '{quiz_id}' not found")))
    }
}

impl RecordAttempt for TestBackend {
    async fn complete_attempt(
        &self,
        quiz_id: &str,
        submission: &AttemptSubmission,
    ) -> Result<CompletionReport, QuizError> {
        if self.failing_submission {
            return Err(QuizError::backend(anyhow!(
                "Server error while completing '{quiz_id}'"
            )));
        }

        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(submission.clone());

        Ok(CompletionReport {
            passed: !self.failed_grading,
        })
    }
}

impl ValidateContent for TestBackend {
    async fn validate_description(&self, text: &str) -> Result<ContentVerdict, QuizError> {
        self.validation_calls.fetch_add(1, Ordering::SeqCst);

        if !self.validation_delay.is_zero() {
            tokio::time::sleep(self.validation_delay).await;
        }
        if self.failing_validation.load(Ordering::SeqCst) {
            return Err(QuizError::backend(anyhow!("Validation service unavailable")));
        }

        let lowered = text.to_lowercase();
        let verdict = self
            .disallowed_terms
            .iter()
            .find(|term| lowered.contains(term.as_str()))
            .map(|term| ContentVerdict::rejected(format!("paragraphs may not contain {term}")))
            .unwrap_or_else(ContentVerdict::ok);

        Ok(verdict)
    }
}

impl VideoStore for TestBackend {
    async fn video_attrs(&self, project_id: &str, skill_id: &str) -> Result<VideoAttrs, QuizError> {
        Ok(self.stored_video(project_id, skill_id).unwrap_or_default())
    }

    async fn save_video_attrs(
        &self,
        project_id: &str,
        skill_id: &str,
        attrs: &VideoAttrs,
    ) -> Result<(), QuizError> {
        self.videos
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((project_id.to_string(), skill_id.to_string()), attrs.clone());
        Ok(())
    }

    async fn delete_video_attrs(&self, project_id: &str, skill_id: &str) -> Result<(), QuizError> {
        self.videos
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(project_id.to_string(), skill_id.to_string()));
        Ok(())
    }
}
