//! Loaded section content and its page layout

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::kind::{SectionKind, QUESTIONS_PER_PAGE};
use crate::{
    error::AppError,
    services::{AnswerChoice, DataService, FetchError, Passage, Question, Section},
};

/// Everything one section page needs, fetched once on mount
#[derive(Debug, Clone)]
pub struct SectionContent {
    pub test_id: i64,
    pub section: Section,
    pub kind: SectionKind,
    /// Ordered by `order`
    pub passages: Vec<Passage>,
    /// Ordered by id; a question's number is its position here plus one
    pub questions: Vec<Question>,
}

/// One screen of the section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    pub passage_id: Option<i64>,
    pub question_ids: Vec<i64>,
}

/// A question as shown before grading: no correct answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: i64,
    pub number: usize,
    pub text: String,
    pub image_url: Option<String>,
    pub passage_id: Option<i64>,
    pub question_context: Option<String>,
    pub answer_choices: Vec<AnswerChoice>,
}

impl SectionContent {
    /// Fetch a section with its passages and questions. Any failure aborts the load.
    pub fn load(data: &dyn DataService, test_id: i64, section_id: i64) -> Result<Self, AppError> {
        let fetch = AppError::fetch;

        let section = data.fetch_section(section_id).map_err(fetch("section"))?;
        let kind = SectionKind::from_type(&section.section_type).ok_or_else(|| {
            fetch("section")(FetchError::Backend(format!(
                "unsupported section type {:?}",
                section.section_type
            )))
        })?;

        let passages = if kind.pages_by_passage() {
            let mut passages = data.fetch_passages(section.id).map_err(fetch("section"))?;
            passages.sort_by_key(|p| p.order);
            passages
        } else {
            Vec::new()
        };

        let mut questions = data
            .fetch_questions(section.id, kind.passage_filter())
            .map_err(fetch("section"))?;
        for question in &mut questions {
            question.answer_choices.sort_by_key(|c| c.order);
        }
        questions.sort_by_key(|q| q.id);

        if let Some(expected) = section.number_of_questions {
            if expected as usize != questions.len() {
                warn!(
                    "Section {} lists {} questions but {} were fetched",
                    section.id,
                    expected,
                    questions.len()
                );
            }
        }
        debug!(
            "Loaded {} section {}: {} passages, {} questions",
            kind,
            section.id,
            passages.len(),
            questions.len()
        );

        Ok(Self {
            test_id,
            section,
            kind,
            passages,
            questions,
        })
    }

    pub fn question(&self, question_id: i64) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn pages(&self) -> Vec<Page> {
        let groups: Vec<(Option<i64>, Vec<i64>)> = if self.kind.pages_by_passage() {
            let standalone: Vec<i64> = self
                .questions
                .iter()
                .filter(|q| q.passage_id.is_none())
                .map(|q| q.id)
                .collect();

            let mut groups = Vec::with_capacity(self.passages.len() + 1);
            if !standalone.is_empty() {
                groups.push((None, standalone));
            }
            for passage in &self.passages {
                let ids = self
                    .questions
                    .iter()
                    .filter(|q| q.passage_id == Some(passage.id))
                    .map(|q| q.id)
                    .collect();
                groups.push((Some(passage.id), ids));
            }
            groups
        } else {
            self.questions
                .chunks(QUESTIONS_PER_PAGE)
                .map(|chunk| (None, chunk.iter().map(|q| q.id).collect()))
                .collect()
        };

        groups
            .into_iter()
            .enumerate()
            .map(|(index, (passage_id, question_ids))| Page {
                index,
                passage_id,
                question_ids,
            })
            .collect()
    }

    pub fn question_views(&self) -> Vec<QuestionView> {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, q)| QuestionView {
                id: q.id,
                number: i + 1,
                text: q.text.clone(),
                image_url: q.image_url.clone(),
                passage_id: q.passage_id,
                question_context: q.question_context.clone(),
                answer_choices: q.answer_choices.clone(),
            })
            .collect()
    }
}
