//! Data service trait and the JSON snapshot implementation

use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use super::records::{
    Passage, PassageFilter, Profile, Question, Role, Section, Test, TestResultRecord, TestSummary,
};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },

    #[error("{0}")]
    Backend(String),
}

impl FetchError {
    fn not_found(what: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }
}

/// Read access to the managed backend. Each call is fire-and-once: no retries.
pub trait DataService: Send + Sync {
    fn fetch_tests(&self) -> Result<Vec<TestSummary>, FetchError>;

    fn fetch_section(&self, section_id: i64) -> Result<Section, FetchError>;

    /// Passages of a section, ordered by their `order` column
    fn fetch_passages(&self, section_id: i64) -> Result<Vec<Passage>, FetchError>;

    fn fetch_questions(
        &self,
        section_id: i64,
        filter: PassageFilter,
    ) -> Result<Vec<Question>, FetchError>;

    fn fetch_profile(&self, user_id: &str) -> Result<Profile, FetchError>;

    /// All profiles with the student role
    fn fetch_students(&self) -> Result<Vec<Profile>, FetchError>;

    fn fetch_results(&self, student_id: &str) -> Result<Vec<TestResultRecord>, FetchError>;

    /// User id behind a session token, if the session is valid
    fn session_user(&self, token: &str) -> Option<String>;
}

/// In-memory snapshot of the backend, loaded from a JSON export
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct JsonCatalog {
    tests: Vec<Test>,
    sections: Vec<Section>,
    passages: Vec<Passage>,
    questions: Vec<Question>,
    profiles: Vec<Profile>,
    test_results: Vec<TestResultRecord>,
    /// token -> user id
    sessions: HashMap<String, String>,
}

impl JsonCatalog {
    pub fn from_json(raw: &str) -> Result<Self, FetchError> {
        serde_json::from_str(raw).map_err(|e| FetchError::Backend(format!("invalid catalog: {}", e)))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FetchError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            FetchError::Backend(format!("failed to read {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json(&raw)?;
        info!(
            "Loaded catalog: {} tests, {} sections, {} questions, {} profiles",
            catalog.tests.len(),
            catalog.sections.len(),
            catalog.questions.len(),
            catalog.profiles.len()
        );
        Ok(catalog)
    }

    fn section(&self, id: Option<i64>) -> Option<Section> {
        id.and_then(|id| self.sections.iter().find(|s| s.id == id).cloned())
    }
}

impl DataService for JsonCatalog {
    fn fetch_tests(&self) -> Result<Vec<TestSummary>, FetchError> {
        Ok(self
            .tests
            .iter()
            .map(|t| TestSummary {
                id: t.id,
                title: t.title.clone(),
                english_section: self.section(t.english_section_id),
                math_section: self.section(t.math_section_id),
                reading_section: self.section(t.reading_section_id),
                science_section: self.section(t.science_section_id),
            })
            .collect())
    }

    fn fetch_section(&self, section_id: i64) -> Result<Section, FetchError> {
        self.section(Some(section_id))
            .ok_or_else(|| FetchError::not_found("section", section_id))
    }

    fn fetch_passages(&self, section_id: i64) -> Result<Vec<Passage>, FetchError> {
        let mut passages: Vec<Passage> = self
            .passages
            .iter()
            .filter(|p| p.section_id == section_id)
            .cloned()
            .collect();
        passages.sort_by_key(|p| p.order);
        Ok(passages)
    }

    fn fetch_questions(
        &self,
        section_id: i64,
        filter: PassageFilter,
    ) -> Result<Vec<Question>, FetchError> {
        let questions: Vec<Question> = self
            .questions
            .iter()
            .filter(|q| q.section_id == section_id && filter.matches(q))
            .cloned()
            .collect();
        debug!(
            "Fetched {} questions for section {} ({:?})",
            questions.len(),
            section_id,
            filter
        );
        Ok(questions)
    }

    fn fetch_profile(&self, user_id: &str) -> Result<Profile, FetchError> {
        self.profiles
            .iter()
            .find(|p| p.id == user_id)
            .cloned()
            .ok_or_else(|| FetchError::not_found("profile", user_id))
    }

    fn fetch_students(&self) -> Result<Vec<Profile>, FetchError> {
        Ok(self
            .profiles
            .iter()
            .filter(|p| p.role == Role::Student)
            .cloned()
            .collect())
    }

    fn fetch_results(&self, student_id: &str) -> Result<Vec<TestResultRecord>, FetchError> {
        Ok(self
            .test_results
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect())
    }

    fn session_user(&self, token: &str) -> Option<String> {
        self.sessions.get(token).cloned()
    }
}
