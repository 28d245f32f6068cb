use std::fmt;

use serde::{Deserialize, Serialize};

pub type QuestionId = u32;
pub type OptionId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizType {
    Survey,
    Quiz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    MultipleChoice,
    TextInput,
}

/// A quiz or survey definition as served by the skills API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(rename = "quizId")]
    id: String,
    name: String,
    quiz_type: QuizType,
    #[serde(default)]
    description: String,
    #[serde(default)]
    point_increment: u32,
    #[serde(default)]
    skill_name: Option<String>,
    questions: Vec<Question>,
    /// Set by the backend when the current user already finished this quiz.
    #[serde(default)]
    already_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    question_type: QuestionType,
    #[serde(rename = "question")]
    text: String,
    #[serde(default)]
    answer_options: Vec<AnswerOption>,
    #[serde(default)]
    multi_select: bool,
    #[serde(default)]
    validate_content: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    id: OptionId,
    #[serde(rename = "answer")]
    text: String,
    #[serde(default)]
    is_correct: bool,
}

impl fmt::Display for Quiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut questions = String::new();
        for question in self.questions() {
            questions.push_str(&format!("\n#{} {}", question.id(), question));
        }
        write!(f, "{}\n{}\n{}", self.name(), self.description(), questions)
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut answers = String::new();
        for option in self.answer_options() {
            answers.push_str(&format!("  [{}] {}\n", option.id(), option.text()));
        }

        match self.question_type {
            QuestionType::TextInput => write!(f, "{}\n  (free text)\n", self.text()),
            QuestionType::MultipleChoice if self.multi_select => {
                write!(f, "{} (select all that apply)\n{}", self.text(), answers)
            }
            QuestionType::MultipleChoice => write!(f, "{}\n{}", self.text(), answers),
        }
    }
}

impl Quiz {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        quiz_type: QuizType,
        point_increment: u32,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quiz_type,
            description: String::new(),
            point_increment,
            skill_name: None,
            questions,
            already_completed: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_skill_name(mut self, skill_name: impl Into<String>) -> Self {
        self.skill_name = Some(skill_name.into());
        self
    }

    pub fn mark_completed(mut self) -> Self {
        self.already_completed = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quiz_type(&self) -> QuizType {
        self.quiz_type
    }

    pub fn is_survey(&self) -> bool {
        self.quiz_type == QuizType::Survey
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn point_increment(&self) -> u32 {
        self.point_increment
    }

    pub fn skill_name(&self) -> Option<&str> {
        self.skill_name.as_deref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn already_completed(&self) -> bool {
        self.already_completed
    }
}

impl Question {
    pub fn multiple_choice(id: QuestionId, text: impl Into<String>, options: Vec<AnswerOption>) -> Self {
        Self {
            id,
            question_type: QuestionType::MultipleChoice,
            text: text.into(),
            answer_options: options,
            multi_select: false,
            validate_content: false,
        }
    }

    pub fn text_input(id: QuestionId, text: impl Into<String>) -> Self {
        Self {
            id,
            question_type: QuestionType::TextInput,
            text: text.into(),
            answer_options: vec![],
            multi_select: false,
            validate_content: false,
        }
    }

    pub fn with_multi_select(mut self) -> Self {
        self.multi_select = true;
        self
    }

    /// Routes text answers through the content-validation collaborator.
    pub fn with_content_validation(mut self) -> Self {
        self.validate_content = true;
        self
    }

    pub fn id(&self) -> QuestionId {
        self.id
    }

    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn answer_options(&self) -> &[AnswerOption] {
        &self.answer_options
    }

    pub fn option(&self, id: OptionId) -> Option<&AnswerOption> {
        self.answer_options.iter().find(|option| option.id == id)
    }

    pub fn is_multi_select(&self) -> bool {
        self.multi_select
    }

    pub fn validates_content(&self) -> bool {
        self.question_type == QuestionType::TextInput && self.validate_content
    }
}

impl AnswerOption {
    pub fn new(id: OptionId, text: impl Into<String>, is_correct: bool) -> AnswerOption {
        Self {
            id,
            text: text.into(),
            is_correct,
        }
    }

    pub fn id(&self) -> OptionId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}
