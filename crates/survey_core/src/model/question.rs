//! Question child records.
//!
//! Questions only matter to this crate for append ordering and for cascade
//! deletion when their section is reconciled away.

use crate::model::section::SectionId;
use serde::{Deserialize, Serialize};

pub type QuestionId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub section_id: SectionId,
    pub title: String,
    /// 1-based position within the owning section.
    pub order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}
