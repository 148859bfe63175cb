//! Survey and question use-case service.
//!
//! # Invariants
//! - Survey and question titles are trimmed and must not be blank.
//! - A question appended without an explicit order lands after the current
//!   last question of its section.

use crate::model::question::Question;
use crate::model::section::SectionId;
use crate::model::survey::{is_valid_survey_id, Survey, SurveyId};
use crate::reconcile::ordering::next_order;
use crate::repo::survey_repo::{SurveyRepoError, SurveyRepository};
use crate::service::ErrorKind;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum SurveyServiceError {
    InvalidTitle,
    InvalidOrder(i64),
    InvalidSurveyId(SurveyId),
    SurveyNotFound(SurveyId),
    SectionNotFound(SectionId),
    Repo(SurveyRepoError),
}

impl SurveyServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTitle | Self::InvalidOrder(_) | Self::InvalidSurveyId(_) => {
                ErrorKind::Validation
            }
            Self::SurveyNotFound(_) | Self::SectionNotFound(_) => ErrorKind::NotFound,
            Self::Repo(_) => ErrorKind::Persistence,
        }
    }
}

impl Display for SurveyServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "title must not be blank"),
            Self::InvalidOrder(order) => write!(f, "question order must be >= 1, got {order}"),
            Self::InvalidSurveyId(id) => write!(f, "invalid survey id: {id}"),
            Self::SurveyNotFound(id) => write!(f, "survey not found: {id}"),
            Self::SectionNotFound(id) => write!(f, "section not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SurveyServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SurveyRepoError> for SurveyServiceError {
    fn from(value: SurveyRepoError) -> Self {
        match value {
            SurveyRepoError::SurveyNotFound(id) => Self::SurveyNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Survey service facade.
pub struct SurveyService<R: SurveyRepository> {
    repo: R,
}

impl<R: SurveyRepository> SurveyService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_survey(&self, title: impl Into<String>) -> Result<Survey, SurveyServiceError> {
        let title = normalize_title(title.into())?;
        let survey = self.repo.create_survey(&title)?;
        info!(
            "event=survey_create module=service status=ok survey_id={}",
            survey.id
        );
        Ok(survey)
    }

    pub fn get_survey(&self, id: SurveyId) -> Result<Survey, SurveyServiceError> {
        if !is_valid_survey_id(id) {
            return Err(SurveyServiceError::InvalidSurveyId(id));
        }
        self.repo
            .get_survey(id)?
            .ok_or(SurveyServiceError::SurveyNotFound(id))
    }

    /// Adds one question to a section, appending when `order` is `None`.
    pub fn add_question(
        &self,
        section_id: SectionId,
        title: impl Into<String>,
        order: Option<i64>,
    ) -> Result<Question, SurveyServiceError> {
        let title = normalize_title(title.into())?;
        if let Some(order) = order.filter(|order| *order < 1) {
            return Err(SurveyServiceError::InvalidOrder(order));
        }

        self.repo.unit_of_work(|repo| {
            if !repo.section_exists(section_id)? {
                return Err(SurveyServiceError::SectionNotFound(section_id));
            }
            let order = match order {
                Some(order) => order,
                None => next_order(
                    repo.list_questions(section_id)?
                        .iter()
                        .map(|question| question.order),
                ),
            };
            Ok(repo.create_question(section_id, &title, order)?)
        })
    }

    pub fn list_questions(
        &self,
        section_id: SectionId,
    ) -> Result<Vec<Question>, SurveyServiceError> {
        if !self.repo.section_exists(section_id)? {
            return Err(SurveyServiceError::SectionNotFound(section_id));
        }
        Ok(self.repo.list_questions(section_id)?)
    }
}

fn normalize_title(value: String) -> Result<String, SurveyServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SurveyServiceError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}
