//! Section use-case service and sync orchestrator.
//!
//! # Responsibility
//! - Converge a survey's sections onto a desired ordering (`sync_sections`).
//! - Provide single-section create/update/delete with append ordering.
//!
//! # Invariants
//! - Input validation happens before the first repository call.
//! - Every mutating use case runs inside exactly one unit of work; a failure
//!   at any step leaves storage untouched.
//! - After a successful sync each phase holds orders `1..=N` in the desired
//!   sequence.

use crate::model::section::{NewSection, Phase, Section, SectionId};
use crate::model::survey::{is_valid_survey_id, SurveyId};
use crate::reconcile::ordering::next_order;
use crate::reconcile::planner::{reconcile, DesiredSections, DesiredSectionsError, SectionPlan};
use crate::repo::section_repo::{SectionRepoError, SectionRepository};
use crate::service::ErrorKind;
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from section service operations.
#[derive(Debug)]
pub enum SectionServiceError {
    /// Survey id can never reference a stored survey.
    InvalidSurveyId(SurveyId),
    /// Direct-edit title is blank.
    InvalidTitle,
    /// Explicit order is below 1.
    InvalidOrder(i64),
    /// Desired section lists were rejected.
    InvalidDesired(DesiredSectionsError),
    SurveyNotFound(SurveyId),
    SectionNotFound(SectionId),
    /// Explicit order already used in the target scope.
    OrderTaken {
        survey_id: SurveyId,
        phase: Phase,
        order: i64,
    },
    /// Repository-level failure.
    Repo(SectionRepoError),
}

impl SectionServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSurveyId(_) | Self::InvalidTitle | Self::InvalidOrder(_) => {
                ErrorKind::Validation
            }
            Self::InvalidDesired(DesiredSectionsError::BlankTitle { .. }) => ErrorKind::Validation,
            Self::InvalidDesired(DesiredSectionsError::DuplicateTitle { .. }) => {
                ErrorKind::Conflict
            }
            Self::OrderTaken { .. } => ErrorKind::Conflict,
            Self::SurveyNotFound(_) | Self::SectionNotFound(_) => ErrorKind::NotFound,
            Self::Repo(_) => ErrorKind::Persistence,
        }
    }
}

impl Display for SectionServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSurveyId(id) => write!(f, "invalid survey id: {id}"),
            Self::InvalidTitle => write!(f, "section title must not be blank"),
            Self::InvalidOrder(order) => write!(f, "section order must be >= 1, got {order}"),
            Self::InvalidDesired(err) => write!(f, "{err}"),
            Self::SurveyNotFound(id) => write!(f, "survey not found: {id}"),
            Self::SectionNotFound(id) => write!(f, "section not found: {id}"),
            Self::OrderTaken {
                survey_id,
                phase,
                order,
            } => write!(
                f,
                "order {order} is already used in survey {survey_id} phase {phase}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SectionServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDesired(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SectionRepoError> for SectionServiceError {
    fn from(value: SectionRepoError) -> Self {
        match value {
            SectionRepoError::SectionNotFound(id) => Self::SectionNotFound(id),
            SectionRepoError::OrderTaken {
                survey_id,
                phase,
                order,
            } => Self::OrderTaken {
                survey_id,
                phase,
                order,
            },
            other => Self::Repo(other),
        }
    }
}

impl From<DesiredSectionsError> for SectionServiceError {
    fn from(value: DesiredSectionsError) -> Self {
        Self::InvalidDesired(value)
    }
}

/// Outcome of one sync: the plan that was applied and the resulting sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub plan: SectionPlan,
    /// Final state, screening first, then by order.
    pub sections: Vec<Section>,
}

/// Section service facade.
pub struct SectionService<R: SectionRepository> {
    repo: R,
}

impl<R: SectionRepository> SectionService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Converges the survey's sections onto `desired` and returns the final list.
    pub fn sync_sections(
        &self,
        survey_id: SurveyId,
        desired: &DesiredSections,
    ) -> Result<Vec<Section>, SectionServiceError> {
        self.sync_sections_with_report(survey_id, desired)
            .map(|report| report.sections)
    }

    /// Like [`sync_sections`](Self::sync_sections), also returning the applied plan.
    ///
    /// # Errors
    /// - Validation: bad survey id or a blank desired title.
    /// - Conflict: a title listed twice within one phase.
    /// - NotFound: the survey does not exist.
    /// - Persistence: storage failure; nothing was applied.
    pub fn sync_sections_with_report(
        &self,
        survey_id: SurveyId,
        desired: &DesiredSections,
    ) -> Result<SyncReport, SectionServiceError> {
        ensure_survey_id(survey_id)?;
        desired.validate()?;

        let started_at = Instant::now();
        debug!(
            "event=section_sync module=service status=start survey_id={survey_id} desired_screening={} desired_main={}",
            desired.screening.len(),
            desired.main.len()
        );

        let result: Result<SyncReport, SectionServiceError> = self.repo.unit_of_work(|repo| {
            ensure_survey_exists(repo, survey_id)?;
            let current = repo.list_sections(survey_id)?;
            let plan = reconcile(&current, desired)?;
            apply_plan(repo, survey_id, &plan)?;
            let sections = repo.list_sections(survey_id)?;
            Ok(SyncReport { plan, sections })
        });

        match &result {
            Ok(report) => info!(
                "event=section_sync module=service status=ok survey_id={survey_id} deleted={} created={} reordered={} duration_ms={}",
                report.plan.to_delete.len(),
                report.plan.to_create.len(),
                report.plan.to_update_order.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=section_sync module=service status=error survey_id={survey_id} error_kind={:?} duration_ms={} error={err}",
                err.kind(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    /// Computes the plan a sync would apply, without mutating anything.
    pub fn preview_sync(
        &self,
        survey_id: SurveyId,
        desired: &DesiredSections,
    ) -> Result<SectionPlan, SectionServiceError> {
        ensure_survey_id(survey_id)?;
        desired.validate()?;
        ensure_survey_exists(&self.repo, survey_id)?;
        let current = self.repo.list_sections(survey_id)?;
        Ok(reconcile(&current, desired)?)
    }

    /// Creates one section, appending it to its phase when `order` is `None`.
    pub fn create_section(
        &self,
        survey_id: SurveyId,
        phase: Phase,
        title: impl Into<String>,
        order: Option<i64>,
    ) -> Result<Section, SectionServiceError> {
        ensure_survey_id(survey_id)?;
        let title = ensure_title(title.into())?;
        if let Some(order) = order {
            ensure_order(order)?;
        }

        let created = self.repo.unit_of_work(|repo| {
            ensure_survey_exists(repo, survey_id)?;
            let order = match order {
                Some(order) => order,
                None => next_order(
                    repo.list_sections(survey_id)?
                        .iter()
                        .filter(|section| section.phase == phase)
                        .map(|section| section.order),
                ),
            };
            let new_section = NewSection {
                survey_id,
                phase,
                title,
                order,
            };
            repo.create_sections(std::slice::from_ref(&new_section))?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    SectionServiceError::Repo(SectionRepoError::InvalidData(
                        "section insert returned no row".to_string(),
                    ))
                })
        })?;

        info!(
            "event=section_create module=service status=ok survey_id={survey_id} section_id={} phase={phase} order={}",
            created.id, created.order
        );
        Ok(created)
    }

    /// Direct edit of title and/or order, outside reconciliation.
    pub fn update_section(
        &self,
        id: SectionId,
        title: Option<String>,
        order: Option<i64>,
    ) -> Result<Section, SectionServiceError> {
        let title = title.map(ensure_title).transpose()?;
        if let Some(order) = order {
            ensure_order(order)?;
        }

        self.repo.unit_of_work(|repo| {
            let existing = repo
                .get_section(id)?
                .ok_or(SectionServiceError::SectionNotFound(id))?;
            let title = title.unwrap_or(existing.title);
            let order = order.unwrap_or(existing.order);
            repo.update_section(id, &title, order)?;
            repo.get_section(id)?
                .ok_or(SectionServiceError::SectionNotFound(id))
        })
    }

    /// Deletes one section and, by storage cascade, its questions.
    pub fn delete_section(&self, id: SectionId) -> Result<(), SectionServiceError> {
        self.repo.unit_of_work(|repo| {
            repo.get_section(id)?
                .ok_or(SectionServiceError::SectionNotFound(id))?;
            repo.delete_sections(&[id])?;
            Ok(())
        })
    }

    pub fn get_section(&self, id: SectionId) -> Result<Section, SectionServiceError> {
        self.repo
            .get_section(id)?
            .ok_or(SectionServiceError::SectionNotFound(id))
    }

    /// Lists the survey's sections, screening first, then by order.
    pub fn list_sections(&self, survey_id: SurveyId) -> Result<Vec<Section>, SectionServiceError> {
        ensure_survey_id(survey_id)?;
        ensure_survey_exists(&self.repo, survey_id)?;
        Ok(self.repo.list_sections(survey_id)?)
    }
}

/// Applies `plan` inside the caller's unit of work.
///
/// Rows that only move are first parked on distinct negative orders, so no
/// intermediate statement ever needs a slot another live row still holds.
fn apply_plan<R: SectionRepository>(
    repo: &R,
    survey_id: SurveyId,
    plan: &SectionPlan,
) -> Result<(), SectionServiceError> {
    if !plan.to_delete.is_empty() {
        repo.delete_sections(&plan.to_delete)?;
    }

    for (index, update) in plan.to_update_order.iter().enumerate() {
        repo.update_section_order(update.id, -(index as i64) - 1)?;
    }

    if !plan.to_create.is_empty() {
        let new_sections: Vec<NewSection> = plan
            .to_create
            .iter()
            .map(|planned| NewSection {
                survey_id,
                phase: planned.phase,
                title: planned.title.clone(),
                order: planned.order,
            })
            .collect();
        repo.create_sections(&new_sections)?;
    }

    for update in &plan.to_update_order {
        repo.update_section_order(update.id, update.order)?;
    }
    Ok(())
}

fn ensure_survey_exists<R: SectionRepository>(
    repo: &R,
    survey_id: SurveyId,
) -> Result<(), SectionServiceError> {
    if !repo.survey_exists(survey_id)? {
        return Err(SectionServiceError::SurveyNotFound(survey_id));
    }
    Ok(())
}

fn ensure_survey_id(survey_id: SurveyId) -> Result<(), SectionServiceError> {
    if !is_valid_survey_id(survey_id) {
        return Err(SectionServiceError::InvalidSurveyId(survey_id));
    }
    Ok(())
}

/// Titles are stored verbatim; only blank input is rejected.
fn ensure_title(title: String) -> Result<String, SectionServiceError> {
    if title.trim().is_empty() {
        return Err(SectionServiceError::InvalidTitle);
    }
    Ok(title)
}

fn ensure_order(order: i64) -> Result<(), SectionServiceError> {
    if order < 1 {
        return Err(SectionServiceError::InvalidOrder(order));
    }
    Ok(())
}
