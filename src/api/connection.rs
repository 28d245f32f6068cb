use std::future::Future;

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use super::interceptor::UserAgreementSignal;
use super::quiz::{OptionId, QuestionId, Quiz};
use crate::config::Settings;
use crate::error::QuizError;
use crate::video::VideoAttrs;

/// HTTP connection to the skills API.
///
/// Successful responses pass through the [`UserAgreementSignal`].
#[derive(Debug, Clone)]
pub struct Connection {
    client: Client,
    base_url: Url,
    user_agreement: UserAgreementSignal,
}

impl Connection {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self {
            client,
            base_url,
            user_agreement: UserAgreementSignal::new(),
        }
    }

    pub fn connect(settings: &Settings) -> Result<Self, QuizError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self::new(client, settings.api_url.clone()))
    }

    pub fn user_agreement(&self) -> &UserAgreementSignal {
        &self.user_agreement
    }

    /// Appends percent-encoded path segments to the base url.
    pub(crate) fn endpoint<I>(&self, segments: I) -> Result<Url, QuizError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| QuizError::BaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, QuizError> {
        let response = request.send().await?.error_for_status()?;
        self.user_agreement.observe(response.headers());
        Ok(response)
    }
}

/// Outcome of the content-validation endpoint for one text value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVerdict {
    pub valid: bool,
    #[serde(default)]
    pub msg: Option<String>,
}

impl ContentVerdict {
    pub fn ok() -> Self {
        Self {
            valid: true,
            msg: None,
        }
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self {
            valid: false,
            msg: Some(msg.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_option_ids: Vec<OptionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSubmission {
    pub attempt_id: Uuid,
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub passed: bool,
}

pub trait RetrieveQuiz {
    fn retrieve_quiz(
        &self,
        quiz_id: &str,
    ) -> impl Future<Output = Result<Quiz, QuizError>> + Send;
}

pub trait RecordAttempt {
    fn complete_attempt(
        &self,
        quiz_id: &str,
        submission: &AttemptSubmission,
    ) -> impl Future<Output = Result<CompletionReport, QuizError>> + Send;
}

/// Free-text check against the platform's disallowed-content policy.
///
/// May take several seconds to answer.
pub trait ValidateContent {
    fn validate_description(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<ContentVerdict, QuizError>> + Send;
}

pub trait VideoStore {
    fn video_attrs(
        &self,
        project_id: &str,
        skill_id: &str,
    ) -> impl Future<Output = Result<VideoAttrs, QuizError>> + Send;

    fn save_video_attrs(
        &self,
        project_id: &str,
        skill_id: &str,
        attrs: &VideoAttrs,
    ) -> impl Future<Output = Result<(), QuizError>> + Send;

    fn delete_video_attrs(
        &self,
        project_id: &str,
        skill_id: &str,
    ) -> impl Future<Output = Result<(), QuizError>> + Send;
}

impl RetrieveQuiz for Connection {
    #[instrument(level = "debug", skip(self))]
    async fn retrieve_quiz(&self, quiz_id: &str) -> Result<Quiz, QuizError> {
        let url = self.endpoint(["api", "quizzes", quiz_id])?;
        let quiz = self.send(self.client.get(url)).await?.json::<Quiz>().await?;
        log::debug!(
            "Retrieved quiz '{}' with {} questions",
            quiz.id(),
            quiz.questions().len()
        );
        Ok(quiz)
    }
}

impl RecordAttempt for Connection {
    #[instrument(level = "info", skip(self, submission), fields(attempt = %submission.attempt_id))]
    async fn complete_attempt(
        &self,
        quiz_id: &str,
        submission: &AttemptSubmission,
    ) -> Result<CompletionReport, QuizError> {
        let attempt_id = submission.attempt_id.to_string();
        let url = self.endpoint(["api", "quizzes", quiz_id, "attempt", &attempt_id, "complete"])?;
        let report = self
            .send(self.client.post(url).json(submission))
            .await?
            .json::<CompletionReport>()
            .await?;
        log::info!("Attempt {} on '{}' recorded", attempt_id, quiz_id);
        Ok(report)
    }
}

impl ValidateContent for Connection {
    async fn validate_description(&self, text: &str) -> Result<ContentVerdict, QuizError> {
        let url = self.endpoint(["api", "validation", "description"])?;
        let body = serde_json::json!({ "value": text });
        let verdict = self
            .send(self.client.post(url).json(&body))
            .await?
            .json::<ContentVerdict>()
            .await?;
        Ok(verdict)
    }
}

impl VideoStore for Connection {
    async fn video_attrs(&self, project_id: &str, skill_id: &str) -> Result<VideoAttrs, QuizError> {
        let url = self.endpoint(["admin", "projects", project_id, "skills", skill_id, "video"])?;
        Ok(self.send(self.client.get(url)).await?.json().await?)
    }

    async fn save_video_attrs(
        &self,
        project_id: &str,
        skill_id: &str,
        attrs: &VideoAttrs,
    ) -> Result<(), QuizError> {
        let url = self.endpoint(["admin", "projects", project_id, "skills", skill_id, "video"])?;
        self.send(self.client.post(url).json(attrs)).await?;
        log::info!("Saved video settings for {}/{}", project_id, skill_id);
        Ok(())
    }

    async fn delete_video_attrs(&self, project_id: &str, skill_id: &str) -> Result<(), QuizError> {
        let url = self.endpoint(["admin", "projects", project_id, "skills", skill_id, "video"])?;
        self.send(self.client.delete(url)).await?;
        log::info!("Cleared video settings for {}/{}", project_id, skill_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(base: &str) -> Connection {
        Connection::new(Client::new(), base.parse().unwrap())
    }

    #[test]
    fn endpoint_joins_onto_trailing_slash_base() {
        let url = connection("http://localhost:8080/")
            .endpoint(["api", "quizzes", "quiz1"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/quizzes/quiz1");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let url = connection("http://localhost:8080/skills")
            .endpoint(["api", "validation", "description"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/skills/api/validation/description");
    }

    #[test]
    fn cannot_be_a_base_url_is_rejected() {
        let err = connection("mailto:someone@example.com")
            .endpoint(["api"])
            .unwrap_err();
        assert!(matches!(err, QuizError::BaseUrl(_)));
    }

    #[test]
    fn submission_serializes_in_camel_case() {
        let submission = AttemptSubmission {
            attempt_id: Uuid::nil(),
            answers: vec![
                SubmittedAnswer {
                    question_id: 1,
                    selected_option_ids: vec![],
                    text: Some("k".into()),
                },
                SubmittedAnswer {
                    question_id: 2,
                    selected_option_ids: vec![2],
                    text: None,
                },
            ],
        };

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["answers"][0]["questionId"], 1);
        assert_eq!(json["answers"][0]["text"], "k");
        assert!(json["answers"][0].get("selectedOptionIds").is_none());
        assert_eq!(json["answers"][1]["selectedOptionIds"][0], 2);
    }
}
