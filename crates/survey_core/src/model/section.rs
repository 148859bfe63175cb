//! Section domain model.
//!
//! # Responsibility
//! - Define the ordered, phase-scoped child record of a survey.
//! - Define the write shapes used for batch creation.
//!
//! # Invariants
//! - `order >= 1` and unique within `(survey_id, phase)`.
//! - `survey_id` and `phase` never change after creation; a section that
//!   "moves" phase or changes title is a new section.

use crate::model::survey::SurveyId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Storage-assigned section identifier.
pub type SectionId = i64;

/// Partition a section belongs to.
///
/// Declaration order is the canonical traversal order: every screening
/// section comes before every main section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Qualification questions asked before the main body.
    Screening,
    /// Main body of the survey.
    Main,
}

impl Phase {
    /// Both phases in traversal order.
    pub const ALL: [Phase; 2] = [Phase::Screening, Phase::Main];

    /// Storage/text form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Screening => "screening",
            Self::Main => "main",
        }
    }

    /// Parses the storage/text form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "screening" => Some(Self::Screening),
            "main" => Some(Self::Main),
            _ => None,
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted section read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub survey_id: SurveyId,
    pub phase: Phase,
    /// Compared byte-for-byte when matching identities.
    pub title: String,
    /// 1-based position within `(survey_id, phase)`.
    pub order: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp, refreshed on any field change.
    pub updated_at: i64,
}

/// Insert shape for batch section creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSection {
    pub survey_id: SurveyId,
    pub phase: Phase,
    pub title: String,
    pub order: i64,
}

#[cfg(test)]
mod tests {
    use super::Phase;

    #[test]
    fn phase_text_form_roundtrips_and_orders_screening_first() {
        for phase in Phase::ALL {
            assert_eq!(Phase::parse(phase.as_str()), Some(phase));
        }
        assert_eq!(Phase::parse("MAIN"), None);
        assert!(Phase::Screening < Phase::Main);
    }

    #[test]
    fn phase_serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&Phase::Screening).unwrap(),
            "\"screening\""
        );
        let parsed: Phase = serde_json::from_str("\"main\"").unwrap();
        assert_eq!(parsed, Phase::Main);
    }
}
