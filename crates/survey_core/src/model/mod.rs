//! Survey domain model.
//!
//! # Responsibility
//! - Define the records shared by repositories, the reconciler and services.
//!
//! # Invariants
//! - Every record id is assigned by storage and never reused.
//! - Sections are scoped to `(survey_id, phase)`; questions to `section_id`.

pub mod question;
pub mod section;
pub mod survey;
