//! Repository layer: storage contracts and their SQLite implementations.
//!
//! # Responsibility
//! - Define the persistence gateways the services depend on.
//! - Isolate SQL, row parsing and transaction handling from use-case code.
//!
//! # Invariants
//! - Repositories borrow a caller-owned connection; there is no global handle.
//! - Constructors refuse connections that are not fully migrated.

pub mod section_repo;
pub mod survey_repo;
