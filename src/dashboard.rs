//! Role-gated dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::AppError,
    services::{DataService, Profile, Role, TestResultRecord},
};

/// Who is looking at the page
#[derive(Debug, Clone, PartialEq)]
pub enum Viewer {
    Guest,
    Member(Profile),
}

impl Viewer {
    /// Resolve a bearer token. Unknown tokens and failed profile lookups are guests.
    pub fn resolve(data: &dyn DataService, token: Option<&str>) -> Self {
        let Some(user_id) = token.and_then(|t| data.session_user(t)) else {
            debug!("No valid session, treating viewer as guest");
            return Self::Guest;
        };

        match data.fetch_profile(&user_id) {
            Ok(profile) => Self::Member(profile),
            Err(e) => {
                warn!("Error fetching profile for {}: {}", user_id, e);
                Self::Guest
            }
        }
    }

    pub fn role_name(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Member(p) if p.role == Role::Admin => "admin",
            Self::Member(_) => "student",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultRow {
    pub id: i64,
    pub test_title: String,
    pub section_type: String,
    pub scaled_score: u8,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Admin { students: Vec<Profile> },
    Student { name: String, results: Vec<TestResultRow> },
}

/// Build the dashboard for `viewer`; guests are turned away
pub fn build_dashboard(data: &dyn DataService, viewer: &Viewer) -> Result<Dashboard, AppError> {
    let profile = match viewer {
        Viewer::Guest => return Err(AppError::Unauthenticated),
        Viewer::Member(profile) => profile,
    };

    match profile.role {
        Role::Admin => {
            let students = data.fetch_students().map_err(AppError::fetch("students"))?;
            Ok(Dashboard::Admin { students })
        }
        Role::Student => {
            let records = data
                .fetch_results(&profile.id)
                .map_err(AppError::fetch("test results"))?;
            let name = if profile.name.trim().is_empty() {
                "Student".to_string()
            } else {
                profile.name.clone()
            };
            Ok(Dashboard::Student {
                name,
                results: result_rows(data, records)?,
            })
        }
    }
}

/// Join titles and section types in, newest first
fn result_rows(
    data: &dyn DataService,
    mut records: Vec<TestResultRecord>,
) -> Result<Vec<TestResultRow>, AppError> {
    let tests = data.fetch_tests().map_err(AppError::fetch("test results"))?;
    records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    Ok(records
        .into_iter()
        .map(|record| {
            let test = tests.iter().find(|t| t.id == record.test_id);
            let section_type = record.section_id.and_then(|section_id| {
                test.into_iter()
                    .flat_map(|t| {
                        [
                            &t.english_section,
                            &t.math_section,
                            &t.reading_section,
                            &t.science_section,
                        ]
                    })
                    .flatten()
                    .find(|s| s.id == section_id)
                    .map(|s| s.section_type.clone())
                    .or_else(|| data.fetch_section(section_id).ok().map(|s| s.section_type))
            });

            TestResultRow {
                id: record.id,
                test_title: test
                    .map(|t| t.title.clone())
                    .unwrap_or_else(|| "Unknown Test".to_string()),
                section_type: section_type.unwrap_or_else(|| "Overall".to_string()),
                scaled_score: record.scaled_score,
                completed_at: record.completed_at,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::JsonCatalog;

    const CATALOG: &str = r#"{
        "tests": [{"id": 1, "title": "Practice Test 1", "math_section_id": 20}],
        "sections": [{"id": 20, "type": "Math", "time_minutes": 60}],
        "profiles": [
            {"id": "s1", "name": "Ada", "username": "ada", "role": "student", "teacher_id": "a1"},
            {"id": "s2", "name": "", "username": "anon", "role": "student"},
            {"id": "a1", "name": "Grace", "username": "grace", "role": "admin"}
        ],
        "test_results": [
            {"id": 1, "student_id": "s1", "test_id": 1, "section_id": 20, "scaled_score": 28, "completed_at": "2024-03-01T10:00:00Z"},
            {"id": 2, "student_id": "s1", "test_id": 1, "scaled_score": 30, "completed_at": "2024-04-01T10:00:00Z"},
            {"id": 3, "student_id": "s1", "test_id": 7, "scaled_score": 19, "completed_at": "2024-01-01T10:00:00Z"},
            {"id": 4, "student_id": "s2", "test_id": 1, "scaled_score": 12, "completed_at": "2024-01-01T10:00:00Z"}
        ],
        "sessions": {"student-token": "s1", "anon-token": "s2", "admin-token": "a1", "ghost-token": "zz"}
    }"#;

    fn catalog() -> JsonCatalog {
        JsonCatalog::from_json(CATALOG).unwrap()
    }

    #[test]
    fn guests_are_rejected() {
        let data = catalog();
        for token in [None, Some("bogus"), Some("ghost-token")] {
            let viewer = Viewer::resolve(&data, token);
            assert_eq!(viewer, Viewer::Guest);
            assert!(matches!(
                build_dashboard(&data, &viewer),
                Err(AppError::Unauthenticated)
            ));
        }
    }

    #[test]
    fn admin_sees_students() {
        let data = catalog();
        let viewer = Viewer::resolve(&data, Some("admin-token"));
        assert_eq!(viewer.role_name(), "admin");
        match build_dashboard(&data, &viewer).unwrap() {
            Dashboard::Admin { students } => {
                let ids: Vec<&str> = students.iter().map(|s| s.id.as_str()).collect();
                assert_eq!(ids, vec!["s1", "s2"]);
            }
            other => panic!("unexpected dashboard {:?}", other),
        }
    }

    #[test]
    fn student_results_newest_first_with_fallbacks() {
        let data = catalog();
        let viewer = Viewer::resolve(&data, Some("student-token"));
        let Dashboard::Student { name, results } = build_dashboard(&data, &viewer).unwrap() else {
            panic!("expected student dashboard");
        };
        assert_eq!(name, "Ada");

        let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(results[0].section_type, "Overall");
        assert_eq!(results[1].section_type, "Math");
        assert_eq!(results[1].test_title, "Practice Test 1");
        assert_eq!(results[2].test_title, "Unknown Test");
    }

    #[test]
    fn blank_name_falls_back() {
        let data = catalog();
        let viewer = Viewer::resolve(&data, Some("anon-token"));
        let Dashboard::Student { name, .. } = build_dashboard(&data, &viewer).unwrap() else {
            panic!("expected student dashboard");
        };
        assert_eq!(name, "Student");
    }
}
