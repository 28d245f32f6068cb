//! Plain-text views of a quiz attempt for the terminal runner.

use crate::api::quiz::{QuestionId, Quiz};
use crate::grading::QuestionGrade;
use crate::runner::SubmitOutcome;
use crate::state::{Answer, AttemptState, Issue};

fn kind(quiz: &Quiz) -> &'static str {
    if quiz.is_survey() {
        "survey"
    } else {
        "quiz"
    }
}

fn points_phrase(quiz: &Quiz, points: u32) -> String {
    match quiz.skill_name() {
        Some(skill) => format!("{points} points for {skill} skill"),
        None => format!("{points} points"),
    }
}

pub fn splash(quiz: &Quiz) -> String {
    let mut text = format!("{}\n", quiz.name());
    if !quiz.description().is_empty() {
        text.push_str(&format!("{}\n", quiz.description()));
    }
    if quiz.point_increment() > 0 {
        text.push_str(&format!(
            "You will earn {} by completing this {}\n",
            points_phrase(quiz, quiz.point_increment()),
            kind(quiz)
        ));
    }
    text.push_str(&format!("Questions: {}", quiz.questions().len()));
    text
}

pub fn already_completed(quiz: &Quiz) -> String {
    format!("You already completed this {}", kind(quiz))
}

fn answer_text(quiz: &Quiz, question: QuestionId, answer: Option<&Answer>) -> String {
    match answer {
        None => "-".into(),
        Some(Answer::Text(text)) => format!("{text:?}"),
        Some(Answer::Selected(selected)) if selected.is_empty() => "-".into(),
        Some(Answer::Selected(selected)) => selected
            .iter()
            .map(|id| {
                quiz.question(question)
                    .and_then(|q| q.option(*id))
                    .map(|option| option.text().to_string())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect::<Vec<_>>()
            .join(", "),
    }
}

pub fn status(quiz: &Quiz, state: &AttemptState) -> String {
    quiz.questions()
        .iter()
        .map(|question| {
            let id = question.id();
            let mut line = format!("#{} {}: {}", id, question.text(), answer_text(quiz, id, state.answer(id)));
            if let Some(check) = state.check(id) {
                if check.result.is_none() {
                    line.push_str(" (validating...)");
                }
            }
            if let Some(issue) = state.issue(id) {
                line.push_str(&format!("\n   ! {issue}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn check_update(state: &AttemptState, question: QuestionId) -> String {
    match state.issue(question) {
        Some(Issue::ValidationFailed(message)) => format!("#{question}: {message}"),
        Some(Issue::Missing) => format!("#{question}: {}", Issue::Missing),
        None => format!("#{question}: ok"),
    }
}

fn grades(quiz: &Quiz, grades: &[QuestionGrade]) -> String {
    let mut text = String::new();
    for grade in grades {
        let mark = if grade.answered_correctly { "correct" } else { "wrong" };
        text.push_str(&format!("\n#{} {}", grade.question_id, mark));
        let Some(question) = quiz.question(grade.question_id) else {
            continue;
        };
        for option in &grade.options {
            let label = question
                .option(option.option_id)
                .map(|o| o.text())
                .unwrap_or_default();
            if option.wrong_selection {
                text.push_str(&format!("\n   x {label}"));
            } else if option.missed_selection {
                text.push_str(&format!("\n   missed: {label}"));
            }
        }
    }
    text
}

pub fn outcome(quiz: &Quiz, outcome: &SubmitOutcome) -> String {
    match outcome {
        SubmitOutcome::Completed { points, grades: graded } => {
            let mut text = if *points > 0 {
                format!(
                    "Congrats!! You just earned {} by completing the {}",
                    points_phrase(quiz, *points),
                    kind(quiz)
                )
            } else {
                format!("Thank you for completing the {}", kind(quiz))
            };
            text.push_str(&grades(quiz, graded));
            text
        }
        SubmitOutcome::Rejected {
            aggregate,
            questions,
        } if questions.is_empty() => aggregate.to_string(),
        SubmitOutcome::Rejected {
            aggregate,
            questions,
        } => {
            let listed = questions
                .iter()
                .map(|id| format!("#{id}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{aggregate} ({listed})")
        }
    }
}
