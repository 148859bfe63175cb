//! Core domain logic for survey authoring.
//! This crate owns section ordering and reconciliation invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DbConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::question::{Question, QuestionId};
pub use model::section::{NewSection, Phase, Section, SectionId};
pub use model::survey::{Survey, SurveyId};
pub use reconcile::identity::{section_key, SectionKey};
pub use reconcile::ordering::next_order;
pub use reconcile::planner::{
    reconcile, DesiredSections, DesiredSectionsError, OrderUpdate, PlannedSection, SectionPlan,
};
pub use repo::section_repo::{
    SectionRepoError, SectionRepoResult, SectionRepository, SqliteSectionRepository,
};
pub use repo::survey_repo::{
    SqliteSurveyRepository, SurveyRepoError, SurveyRepoResult, SurveyRepository,
};
pub use service::section_service::{SectionService, SectionServiceError, SyncReport};
pub use service::survey_service::{SurveyService, SurveyServiceError};
pub use service::ErrorKind;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
