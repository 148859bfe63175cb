//! Identity key used to decide which persisted section "is" a desired entry.

use crate::model::section::{Phase, Section};

/// `(phase, title)` pair; two sections are the same entity iff keys match.
///
/// Titles are compared exactly. `"A"` and `"A "` are different entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionKey<'a> {
    pub phase: Phase,
    pub title: &'a str,
}

pub fn section_key(phase: Phase, title: &str) -> SectionKey<'_> {
    SectionKey { phase, title }
}

impl Section {
    /// Identity key of this persisted section.
    pub fn key(&self) -> SectionKey<'_> {
        section_key(self.phase, &self.title)
    }
}
