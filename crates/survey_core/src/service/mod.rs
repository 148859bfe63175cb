//! Use-case services.
//!
//! # Responsibility
//! - Validate caller input before any storage access.
//! - Run multi-step use cases inside one repository unit of work.
//! - Classify failures into the caller-facing [`ErrorKind`] taxonomy.

pub mod section_service;
pub mod survey_service;

/// Caller-facing failure classes shared by every service error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input rejected before any storage access.
    Validation,
    /// Input contradicts itself or existing state (duplicate title, taken order).
    Conflict,
    /// Referenced survey, section or question does not exist.
    NotFound,
    /// Storage failed; the unit of work was rolled back and a retry is safe.
    Persistence,
}
