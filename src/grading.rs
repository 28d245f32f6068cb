use crate::api::quiz::{OptionId, Question, QuestionId, QuestionType};
use crate::state::Answer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionGrade {
    pub option_id: OptionId,
    pub selected: bool,
    /// Selected, but not a correct option.
    pub wrong_selection: bool,
    /// A correct option that was not selected.
    pub missed_selection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionGrade {
    pub question_id: QuestionId,
    pub answered_correctly: bool,
    pub options: Vec<OptionGrade>,
}

/// Grades a multiple-choice answer against the options' correctness flags.
///
/// Returns `None` for text questions, which are never graded.
pub fn grade_question(question: &Question, answer: Option<&Answer>) -> Option<QuestionGrade> {
    if question.question_type() != QuestionType::MultipleChoice {
        return None;
    }

    let selected = answer.and_then(Answer::selected);
    let options: Vec<OptionGrade> = question
        .answer_options()
        .iter()
        .map(|option| {
            let is_selected = selected.is_some_and(|ids| ids.contains(&option.id()));
            OptionGrade {
                option_id: option.id(),
                selected: is_selected,
                wrong_selection: is_selected && !option.is_correct(),
                missed_selection: !is_selected && option.is_correct(),
            }
        })
        .collect();

    let answered_correctly = options
        .iter()
        .all(|grade| !grade.wrong_selection && !grade.missed_selection);

    Some(QuestionGrade {
        question_id: question.id(),
        answered_correctly,
        options,
    })
}
