//! Section reconciliation planner.
//!
//! # Responsibility
//! - Validate a caller's desired section lists.
//! - Diff persisted sections against the desired lists by identity key.
//!
//! # Invariants
//! - Desired position `i` (0-based) within a phase maps to `order = i + 1`.
//! - Matched sections only ever receive order updates; title and phase are
//!   identity and stay untouched.
//! - Output ordering is deterministic: deletions follow `current`,
//!   creations and updates follow the desired lists, screening first.

use crate::model::section::{Phase, Section, SectionId};
use crate::reconcile::identity::{section_key, SectionKey};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-supplied target ordering of section titles, per phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesiredSections {
    pub screening: Vec<String>,
    pub main: Vec<String>,
}

/// Rejection reasons for a desired section list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredSectionsError {
    /// Title at 1-based `position` is empty or whitespace only.
    BlankTitle { phase: Phase, position: usize },
    /// The same title appears twice within one phase.
    DuplicateTitle { phase: Phase, title: String },
}

impl Display for DesiredSectionsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle { phase, position } => {
                write!(f, "{phase} section title at position {position} is blank")
            }
            Self::DuplicateTitle { phase, title } => {
                write!(f, "{phase} section title `{title}` is listed twice")
            }
        }
    }
}

impl Error for DesiredSectionsError {}

impl DesiredSections {
    pub fn new<S: Into<String>>(
        screening: impl IntoIterator<Item = S>,
        main: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            screening: screening.into_iter().map(Into::into).collect(),
            main: main.into_iter().map(Into::into).collect(),
        }
    }

    /// Ordered titles for one phase.
    pub fn titles(&self, phase: Phase) -> &[String] {
        match phase {
            Phase::Screening => &self.screening,
            Phase::Main => &self.main,
        }
    }

    /// Total number of desired sections across both phases.
    pub fn len(&self) -> usize {
        self.screening.len() + self.main.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rejects blank titles and duplicate identity keys.
    ///
    /// Empty lists are valid and mean "no sections in this phase".
    pub fn validate(&self) -> Result<(), DesiredSectionsError> {
        for phase in Phase::ALL {
            let mut seen = HashSet::new();
            for (index, title) in self.titles(phase).iter().enumerate() {
                if title.trim().is_empty() {
                    return Err(DesiredSectionsError::BlankTitle {
                        phase,
                        position: index + 1,
                    });
                }
                if !seen.insert(title.as_str()) {
                    return Err(DesiredSectionsError::DuplicateTitle {
                        phase,
                        title: title.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Desired entries in traversal order with their target order.
    fn positioned(&self) -> impl Iterator<Item = (SectionKey<'_>, i64)> + '_ {
        Phase::ALL.into_iter().flat_map(move |phase| {
            self.titles(phase)
                .iter()
                .enumerate()
                .map(move |(index, title)| (section_key(phase, title), index as i64 + 1))
        })
    }
}

/// Section to insert during a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSection {
    pub phase: Phase,
    pub title: String,
    pub order: i64,
}

/// Order-only change for an existing section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderUpdate {
    pub id: SectionId,
    pub order: i64,
}

/// Mutations that converge persisted sections onto the desired lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionPlan {
    pub to_delete: Vec<SectionId>,
    pub to_create: Vec<PlannedSection>,
    pub to_update_order: Vec<OrderUpdate>,
}

impl SectionPlan {
    /// `true` when persisted state already matches the desired lists.
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty() && self.to_update_order.is_empty()
    }
}

/// Computes the plan converging `current` onto `desired`.
///
/// `current` is every persisted section of one survey, in any order.
///
/// Duplicate identity keys in `current` resolve last-wins; the shadowed rows
/// are scheduled for deletion so the scope ends up with one row per key.
///
/// # Errors
/// Only an invalid `desired` (see [`DesiredSections::validate`]).
pub fn reconcile(
    current: &[Section],
    desired: &DesiredSections,
) -> Result<SectionPlan, DesiredSectionsError> {
    desired.validate()?;

    let mut current_by_key: HashMap<SectionKey<'_>, &Section> =
        HashMap::with_capacity(current.len());
    for section in current {
        if let Some(shadowed) = current_by_key.insert(section.key(), section) {
            warn!(
                "event=section_plan module=reconcile status=duplicate_key survey_id={} phase={} shadowed_id={} kept_id={}",
                section.survey_id, section.phase, shadowed.id, section.id
            );
        }
    }

    let desired_keys: HashSet<SectionKey<'_>> = desired.positioned().map(|(key, _)| key).collect();

    let mut plan = SectionPlan::default();
    for section in current {
        let key = section.key();
        let is_kept = current_by_key
            .get(&key)
            .is_some_and(|kept| std::ptr::eq(*kept, section));
        if !is_kept || !desired_keys.contains(&key) {
            plan.to_delete.push(section.id);
        }
    }

    for (key, order) in desired.positioned() {
        match current_by_key.get(&key) {
            Some(existing) if existing.order != order => {
                plan.to_update_order.push(OrderUpdate {
                    id: existing.id,
                    order,
                });
            }
            Some(_) => {}
            None => plan.to_create.push(PlannedSection {
                phase: key.phase,
                title: key.title.to_string(),
                order,
            }),
        }
    }

    Ok(plan)
}
