use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::connection::{ValidateContent, VideoStore};
use crate::error::QuizError;
use crate::state::CheckResult;
use crate::validator::ContentCheck;

pub const CAPTIONS_EXAMPLE: &str = "WEBVTT

1
00:00:00.500 --> 00:00:04.000
This is the very first caption!

2
00:00:05.000 --> 00:00:09.000
Captions are shown while the video plays.";

/// Video attributes as stored by the skills API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoAttrs {
    pub video_url: String,
    pub video_type: String,
    pub captions: String,
    pub transcript: String,
}

impl VideoAttrs {
    pub fn has_url(&self) -> bool {
        !self.video_url.trim().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        [&self.video_url, &self.video_type, &self.captions, &self.transcript]
            .iter()
            .all(|value| value.trim().is_empty())
    }
}

/// Fields that depend on the video URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoField {
    VideoType,
    Captions,
    Transcript,
}

impl fmt::Display for VideoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideoType => write!(f, "Video Type"),
            Self::Captions => write!(f, "Captions"),
            Self::Transcript => write!(f, "Transcript"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VideoSettingsForm {
    attrs: VideoAttrs,
    /// Content check of the transcript text it was computed for.
    transcript_check: Option<(String, CheckResult)>,
}

impl VideoSettingsForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attrs(attrs: VideoAttrs) -> Self {
        Self {
            attrs,
            transcript_check: None,
        }
    }

    #[instrument(level = "debug", skip(store))]
    pub async fn load<S: VideoStore>(
        store: &S,
        project_id: &str,
        skill_id: &str,
    ) -> Result<Self, QuizError> {
        Ok(Self::from_attrs(store.video_attrs(project_id, skill_id).await?))
    }

    pub fn attrs(&self) -> &VideoAttrs {
        &self.attrs
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.attrs.video_url = url.into();
    }

    pub fn set_video_type(&mut self, video_type: impl Into<String>) {
        self.attrs.video_type = video_type.into();
    }

    pub fn set_captions(&mut self, captions: impl Into<String>) {
        self.attrs.captions = captions.into();
    }

    pub fn set_transcript(&mut self, transcript: impl Into<String>) {
        self.attrs.transcript = transcript.into();
    }

    fn value(&self, field: VideoField) -> &str {
        match field {
            VideoField::VideoType => &self.attrs.video_type,
            VideoField::Captions => &self.attrs.captions,
            VideoField::Transcript => &self.attrs.transcript,
        }
    }

    pub fn field_error(&self, field: VideoField) -> Option<String> {
        if field == VideoField::Transcript {
            if let Some((checked, result)) = &self.transcript_check {
                if *checked == self.attrs.transcript {
                    match result {
                        CheckResult::Rejected(message) | CheckResult::Unavailable(message) => {
                            return Some(format!("Video Transcript - {message}"));
                        }
                        CheckResult::Passed => {}
                    }
                }
            }
        }

        let value = self.value(field);
        (!self.attrs.has_url() && !value.trim().is_empty())
            .then(|| format!("{field} is not valid without Video URL field"))
    }

    pub fn errors(&self) -> Vec<(VideoField, String)> {
        [VideoField::VideoType, VideoField::Captions, VideoField::Transcript]
            .into_iter()
            .filter_map(|field| self.field_error(field).map(|error| (field, error)))
            .collect()
    }

    pub fn can_save(&self) -> bool {
        self.attrs.has_url() && self.errors().is_empty()
    }

    pub fn can_preview(&self) -> bool {
        self.can_save()
    }

    pub fn can_clear(&self) -> bool {
        !self.attrs.is_empty()
    }

    /// Resets all four fields at once.
    pub fn clear(&mut self) {
        self.attrs = VideoAttrs::default();
        self.transcript_check = None;
    }

    pub fn captions_example_available(&self) -> bool {
        self.attrs.captions.trim().is_empty()
    }

    pub fn fill_captions_example(&mut self) {
        if self.captions_example_available() {
            self.attrs.captions = CAPTIONS_EXAMPLE.to_string();
        }
    }

    /// Runs the transcript through the content policy.
    pub async fn check_transcript<V: ValidateContent>(&mut self, checker: &ContentCheck<V>) {
        let transcript = self.attrs.transcript.clone();
        if transcript.trim().is_empty() {
            self.transcript_check = None;
            return;
        }
        let result = checker.check(&transcript).await;
        self.transcript_check = Some((transcript, result));
    }

    fn transcript_judged(&self) -> bool {
        self.attrs.transcript.trim().is_empty()
            || self.transcript_check.as_ref().is_some_and(|(checked, result)| {
                *checked == self.attrs.transcript
                    && matches!(result, CheckResult::Passed | CheckResult::Rejected(_))
            })
    }

    /// Stores the settings once the transcript has a verdict for its current text.
    #[instrument(level = "info", skip(self, store, checker))]
    pub async fn save<S: VideoStore, V: ValidateContent>(
        &mut self,
        store: &S,
        checker: &ContentCheck<V>,
        project_id: &str,
        skill_id: &str,
    ) -> Result<(), QuizError> {
        if !self.transcript_judged() {
            self.check_transcript(checker).await;
        }
        if !self.can_save() {
            let reason = self
                .errors()
                .into_iter()
                .map(|(_, error)| error)
                .next()
                .unwrap_or_else(|| "Video URL is required".to_string());
            log::info!("Refusing to save video settings: {}", reason);
            return Err(QuizError::InvalidVideoSettings(reason));
        }
        store.save_video_attrs(project_id, skill_id, &self.attrs).await
    }

    /// Clears the form and removes the stored settings.
    #[instrument(level = "info", skip(self, store))]
    pub async fn clear_saved<S: VideoStore>(
        &mut self,
        store: &S,
        project_id: &str,
        skill_id: &str,
    ) -> Result<(), QuizError> {
        store.delete_video_attrs(project_id, skill_id).await?;
        self.clear();
        Ok(())
    }
}

/// Why the Video self-report type can't be picked yet, if it can't.
pub fn video_self_report_message(
    is_new_skill: bool,
    saved: Option<&VideoAttrs>,
) -> Option<&'static str> {
    if is_new_skill {
        return Some("Please create skill and configure video settings first");
    }
    match saved {
        Some(attrs) if attrs.has_url() => None,
        _ => Some("Please configure video settings first"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::test_backend::TestBackend;

    fn filled() -> VideoSettingsForm {
        VideoSettingsForm::from_attrs(VideoAttrs {
            video_url: "http://someurl.mp4".into(),
            video_type: "video/webm".into(),
            captions: "some".into(),
            transcript: "another".into(),
        })
    }

    #[test]
    fn empty_form_offers_nothing() {
        let form = VideoSettingsForm::new();
        assert!(!form.can_save());
        assert!(!form.can_preview());
        assert!(!form.can_clear());
        assert!(form.errors().is_empty());
    }

    #[test]
    fn fields_without_url_are_flagged_until_url_is_set() {
        let mut form = VideoSettingsForm::new();
        form.set_video_type("video/webm");
        assert_eq!(
            form.field_error(VideoField::VideoType).as_deref(),
            Some("Video Type is not valid without Video URL field")
        );
        assert!(form.can_clear());

        form.set_captions("captions");
        form.set_transcript("transcript");
        assert_eq!(form.errors().len(), 3);
        assert_eq!(
            form.field_error(VideoField::Captions).as_deref(),
            Some("Captions is not valid without Video URL field")
        );
        assert_eq!(
            form.field_error(VideoField::Transcript).as_deref(),
            Some("Transcript is not valid without Video URL field")
        );
        assert!(!form.can_save());
        assert!(!form.can_preview());

        form.set_url("/static/videos/create-quiz.mp4");
        assert!(form.errors().is_empty());
        assert!(form.can_save());
        assert!(form.can_preview());
    }

    #[test]
    fn clear_resets_everything() {
        let mut form = filled();
        assert!(form.can_save() && form.can_clear());

        form.clear();

        assert_eq!(form.attrs(), &VideoAttrs::default());
        assert!(!form.can_save());
        assert!(!form.can_preview());
        assert!(!form.can_clear());

        form.set_video_type("video/webm");
        assert!(form.field_error(VideoField::VideoType).is_some());
    }

    #[test]
    fn captions_example_only_offered_while_empty() {
        let mut form = VideoSettingsForm::new();
        assert!(form.captions_example_available());
        form.fill_captions_example();
        assert!(form.attrs().captions.starts_with("WEBVTT"));
        assert!(!form.captions_example_available());
    }

    #[test]
    fn video_self_report_requires_saved_url() {
        let saved = VideoAttrs {
            video_url: "http://someurl.mp4".into(),
            ..VideoAttrs::default()
        };
        assert_eq!(
            video_self_report_message(true, None),
            Some("Please create skill and configure video settings first")
        );
        assert_eq!(
            video_self_report_message(false, Some(&VideoAttrs::default())),
            Some("Please configure video settings first")
        );
        assert_eq!(video_self_report_message(false, Some(&saved)), None);
    }

    #[tokio::test]
    async fn transcript_content_rejection_blocks_save() {
        let backend = Arc::new(TestBackend::new().with_disallowed_term("jabberwocky"));
        let checker = ContentCheck::new(backend, Duration::from_secs(5));

        let mut form = VideoSettingsForm::new();
        form.set_transcript("jabberwocky");
        form.check_transcript(&checker).await;

        assert_eq!(
            form.field_error(VideoField::Transcript).as_deref(),
            Some("Video Transcript - paragraphs may not contain jabberwocky")
        );
        assert!(!form.can_save());
        assert!(!form.can_preview());
        assert!(form.can_clear());

        form.set_url("http://some.vid");
        assert!(!form.can_save());

        form.set_transcript("transcript");
        assert!(form.can_save());
    }

    fn checker(backend: &Arc<TestBackend>) -> ContentCheck<TestBackend> {
        ContentCheck::new(Arc::clone(backend), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn save_and_clear_round_trip_through_the_store() {
        let backend = Arc::new(TestBackend::new());
        let mut form = filled();

        form.save(backend.as_ref(), &checker(&backend), "proj1", "skill1")
            .await
            .unwrap();
        assert_eq!(backend.validation_calls(), 1);
        let reloaded = VideoSettingsForm::load(backend.as_ref(), "proj1", "skill1")
            .await
            .unwrap();
        assert_eq!(reloaded.attrs(), form.attrs());

        form.clear_saved(backend.as_ref(), "proj1", "skill1").await.unwrap();
        assert!(!form.can_clear());
        assert_eq!(backend.stored_video("proj1", "skill1"), None);
    }

    #[tokio::test]
    async fn save_is_refused_without_url() {
        let backend = Arc::new(TestBackend::new());
        let mut form = VideoSettingsForm::new();
        form.set_video_type("video/webm");

        let err = form
            .save(backend.as_ref(), &checker(&backend), "proj1", "skill1")
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::InvalidVideoSettings(_)));
        assert_eq!(backend.stored_video("proj1", "skill1"), None);
    }

    #[tokio::test]
    async fn unchecked_transcript_is_judged_before_saving() {
        let backend = Arc::new(TestBackend::new().with_disallowed_term("jabberwocky"));
        let mut form = VideoSettingsForm::new();
        form.set_url("http://some.vid");
        form.set_transcript("jabberwocky");
        assert!(form.can_save());

        let err = form
            .save(backend.as_ref(), &checker(&backend), "proj1", "skill1")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            QuizError::InvalidVideoSettings(reason)
                if reason == "Video Transcript - paragraphs may not contain jabberwocky"
        ));
        assert_eq!(backend.stored_video("proj1", "skill1"), None);
    }

    #[tokio::test]
    async fn transcript_outage_is_retried_on_save() {
        let backend = Arc::new(TestBackend::new().with_failing_validation());
        let checker = checker(&backend);
        let mut form = filled();

        assert!(form.save(backend.as_ref(), &checker, "proj1", "skill1").await.is_err());

        backend.set_validation_failing(false);
        form.save(backend.as_ref(), &checker, "proj1", "skill1").await.unwrap();
        assert_eq!(backend.validation_calls(), 2);
        assert!(backend.stored_video("proj1", "skill1").is_some());
    }
}
