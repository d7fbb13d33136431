//! Records returned by the data service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    /// Subject name, e.g. "English" or "Math"
    #[serde(rename = "type")]
    pub section_type: String,
    #[serde(default)]
    pub instructions: String,
    /// Allotted time; zero or negative means untimed
    #[serde(default)]
    pub time_minutes: i64,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub number_of_questions: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: i64,
    pub section_id: i64,
    pub title: String,
    pub passage_text: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerChoice {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub section_id: i64,
    pub text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub correct_answer_choice_id: Option<i64>,
    #[serde(default)]
    pub passage_id: Option<i64>,
    #[serde(default)]
    pub question_context: Option<String>,
    #[serde(default)]
    pub answer_choices: Vec<AnswerChoice>,
}

impl Question {
    pub fn choice(&self, answer_choice_id: i64) -> Option<&AnswerChoice> {
        self.answer_choices.iter().find(|c| c.id == answer_choice_id)
    }
}

/// A practice test as stored: one optional section per subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub english_section_id: Option<i64>,
    #[serde(default)]
    pub math_section_id: Option<i64>,
    #[serde(default)]
    pub reading_section_id: Option<i64>,
    #[serde(default)]
    pub science_section_id: Option<i64>,
}

/// A test with its sections joined in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub id: i64,
    pub title: String,
    pub english_section: Option<Section>,
    pub math_section: Option<Section>,
    pub reading_section: Option<Section>,
    pub science_section: Option<Section>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub teacher_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultRecord {
    pub id: i64,
    pub student_id: String,
    pub test_id: i64,
    /// Absent for whole-test results
    #[serde(default)]
    pub section_id: Option<i64>,
    /// ACT scale, 1-36
    pub scaled_score: u8,
    pub completed_at: DateTime<Utc>,
}

/// Which questions of a section to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassageFilter {
    Any,
    /// `passage_id` is null
    Standalone,
    /// `passage_id` is not null
    WithPassage,
}

impl PassageFilter {
    pub fn matches(&self, question: &Question) -> bool {
        match self {
            Self::Any => true,
            Self::Standalone => question.passage_id.is_none(),
            Self::WithPassage => question.passage_id.is_some(),
        }
    }
}
