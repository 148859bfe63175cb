//! Survey aggregate root.

use serde::{Deserialize, Serialize};

/// Storage-assigned survey identifier. Valid ids are `>= 1`.
pub type SurveyId = i64;

/// Owning aggregate for sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    pub id: SurveyId,
    pub title: String,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// Returns whether `id` can reference a stored survey at all.
pub fn is_valid_survey_id(id: SurveyId) -> bool {
    id >= 1
}
