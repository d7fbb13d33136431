//! Subject-specific fetch and layout rules

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::services::PassageFilter;

/// Questions shown per page for subjects without passages
pub const QUESTIONS_PER_PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    English,
    Math,
    Reading,
    Science,
}

impl SectionKind {
    /// Parse a section's `type` column, ignoring case and surrounding whitespace
    pub fn from_type(section_type: &str) -> Option<Self> {
        match section_type.trim().to_ascii_lowercase().as_str() {
            "english" => Some(Self::English),
            "math" => Some(Self::Math),
            "reading" => Some(Self::Reading),
            "science" => Some(Self::Science),
            _ => None,
        }
    }

    pub fn passage_filter(&self) -> PassageFilter {
        match self {
            Self::English => PassageFilter::Any,
            Self::Math => PassageFilter::Standalone,
            Self::Reading | Self::Science => PassageFilter::WithPassage,
        }
    }

    /// Whether pages follow passages rather than fixed-size question chunks
    pub fn pages_by_passage(&self) -> bool {
        !matches!(self, Self::Math)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::English => "English",
            Self::Math => "Math",
            Self::Reading => "Reading",
            Self::Science => "Science",
        };
        f.write_str(name)
    }
}
