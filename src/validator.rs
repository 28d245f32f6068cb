use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::api::connection::ValidateContent;
use crate::api::quiz::{Question, QuestionType};
use crate::state::{Answer, CheckResult, Issue, TextCheck};

pub const UNAVAILABLE_MESSAGE: &str = "Unable to validate the answer, please try again.";
const DEFAULT_REJECTION: &str = "Answer contains content that is not allowed";

/// A pending or stale check leaves a non-empty text answer provisionally valid.
pub fn validate_question(
    question: &Question,
    answer: Option<&Answer>,
    check: Option<&TextCheck>,
) -> Option<Issue> {
    match question.question_type() {
        QuestionType::MultipleChoice => match answer.and_then(Answer::selected) {
            Some(selected) if !selected.is_empty() => None,
            _ => Some(Issue::Missing),
        },
        QuestionType::TextInput => {
            let text = answer.and_then(Answer::as_text).unwrap_or_default();
            if text.trim().is_empty() {
                return Some(Issue::Missing);
            }
            if !question.validates_content() {
                return None;
            }

            match check {
                Some(check) if check.text == text => match &check.result {
                    Some(CheckResult::Rejected(message))
                    | Some(CheckResult::Unavailable(message)) => {
                        Some(Issue::ValidationFailed(message.clone()))
                    }
                    Some(CheckResult::Passed) | None => None,
                },
                _ => None,
            }
        }
    }
}

/// Cached, time-bounded access to a [`ValidateContent`] collaborator.
///
/// Clones share the cache.
pub struct ContentCheck<V> {
    validator: Arc<V>,
    cache: Arc<Mutex<HashMap<String, CheckResult>>>,
    timeout: Duration,
}

impl<V> Clone for ContentCheck<V> {
    fn clone(&self) -> Self {
        Self {
            validator: Arc::clone(&self.validator),
            cache: Arc::clone(&self.cache),
            timeout: self.timeout,
        }
    }
}

impl<V: ValidateContent> ContentCheck<V> {
    pub fn new(validator: Arc<V>, timeout: Duration) -> Self {
        Self {
            validator,
            cache: Arc::default(),
            timeout,
        }
    }

    pub fn cached(&self, text: &str) -> Option<CheckResult> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(text)
            .cloned()
    }

    /// Only definitive answers are cached.
    pub async fn check(&self, text: &str) -> CheckResult {
        if let Some(hit) = self.cached(text) {
            return hit;
        }

        let result = match tokio::time::timeout(
            self.timeout,
            self.validator.validate_description(text),
        )
        .await
        {
            Ok(Ok(verdict)) if verdict.valid => CheckResult::Passed,
            Ok(Ok(verdict)) => CheckResult::Rejected(
                verdict.msg.unwrap_or_else(|| DEFAULT_REJECTION.to_string()),
            ),
            Ok(Err(e)) => {
                log::warn!("Content validation failed: {}", e);
                return CheckResult::Unavailable(UNAVAILABLE_MESSAGE.into());
            }
            Err(_) => {
                log::warn!("Content validation timed out after {:?}", self.timeout);
                return CheckResult::Unavailable(UNAVAILABLE_MESSAGE.into());
            }
        };

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(text.to_string(), result.clone());
        result
    }
}
