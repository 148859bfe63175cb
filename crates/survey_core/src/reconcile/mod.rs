//! Pure section reconciliation.
//!
//! # Responsibility
//! - Correlate persisted and desired sections by identity key.
//! - Compute the minimal delete/create/reorder plan for one survey.
//! - Assign append orders for single-entry creation.
//!
//! # Invariants
//! - Nothing in this module performs I/O.
//! - Applying a plan and reconciling again with the same input yields an
//!   empty plan.

pub mod identity;
pub mod ordering;
pub mod planner;
