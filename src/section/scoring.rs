//! Exact-match grading

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::services::Question;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerReportItem {
    pub question_id: i64,
    pub number: usize,
    pub is_correct: bool,
    pub user_answer: Option<i64>,
    pub correct_answer: Option<i64>,
    pub user_answer_text: Option<String>,
    pub correct_answer_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionReport {
    pub correct: usize,
    pub total: usize,
    pub items: Vec<AnswerReportItem>,
}

impl fmt::Display for SectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

/// Grade `questions` in order against `answers` (question id -> answer choice id).
///
/// A question counts only when an answer was given and it equals the stored correct
/// choice; a question with no stored correct choice can never be right.
pub fn score_section(questions: &[Question], answers: &HashMap<i64, i64>) -> SectionReport {
    let items: Vec<AnswerReportItem> = questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let user_answer = answers.get(&question.id).copied();
            let correct_answer = question.correct_answer_choice_id;
            let is_correct = matches!((user_answer, correct_answer), (Some(u), Some(c)) if u == c);
            let text = |id: Option<i64>| {
                id.and_then(|id| question.choice(id))
                    .map(|c| c.text.clone())
            };

            AnswerReportItem {
                question_id: question.id,
                number: i + 1,
                is_correct,
                user_answer,
                correct_answer,
                user_answer_text: text(user_answer),
                correct_answer_text: text(correct_answer),
            }
        })
        .collect();

    SectionReport {
        correct: items.iter().filter(|item| item.is_correct).count(),
        total: items.len(),
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::AnswerChoice;

    fn question(id: i64, correct: Option<i64>) -> Question {
        Question {
            id,
            section_id: 1,
            text: format!("question {}", id),
            image_url: None,
            correct_answer_choice_id: correct,
            passage_id: None,
            question_context: None,
            answer_choices: vec![
                AnswerChoice {
                    id: id * 10,
                    text: "first".into(),
                    order: 1,
                },
                AnswerChoice {
                    id: id * 10 + 1,
                    text: "second".into(),
                    order: 2,
                },
            ],
        }
    }

    #[test]
    fn two_of_three() {
        let questions = vec![
            question(1, Some(10)),
            question(2, Some(21)),
            question(3, Some(30)),
        ];
        let answers = HashMap::from([(1, 10), (2, 99), (3, 30)]);

        let report = score_section(&questions, &answers);
        assert_eq!(report.correct, 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.to_string(), "2/3");
        assert!(!report.items[1].is_correct);
        assert_eq!(report.items[1].user_answer_text, None);
        assert_eq!(report.items[1].correct_answer_text.as_deref(), Some("second"));
    }

    #[test]
    fn unanswered_never_counts() {
        let questions = vec![question(1, Some(10)), question(2, None)];

        let report = score_section(&questions, &HashMap::new());
        assert_eq!(report.correct, 0);
        assert_eq!(report.items[0].user_answer, None);

        // A null correct answer stays wrong whatever was picked
        let report = score_section(&questions, &HashMap::from([(2, 20)]));
        assert_eq!(report.correct, 0);
    }

    #[test]
    fn empty_section() {
        let report = score_section(&[], &HashMap::from([(5, 50)]));
        assert_eq!((report.correct, report.total), (0, 0));
    }
}
