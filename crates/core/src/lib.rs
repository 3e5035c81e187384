//! # Clinia Core
//!
//! Core business logic for the clinia clinical-office system.
//!
//! This crate contains pure domain operations and the data-access boundary:
//! - Appointment slot availability over a canonical slot grid
//! - Role-scoped record visibility and per-viewer permissions
//! - Display enrichment (foreign keys to human-readable names)
//! - Statically declared field mappings for record edits
//! - Debounced, generation-stamped search coordination
//!
//! **No API concerns**: HTTP servers, session tokens, or OpenAPI documentation
//! belong in `api-rest`.

pub mod config;
pub mod enrich;
pub mod error;
pub mod fields;
pub mod records;
pub mod roles;
pub mod scheduling;
pub mod scope;
pub mod search;
pub mod session;
pub mod store;

pub use clinia_types::{EmailAddress, EmailError, NonEmptyText, TextError};
pub use config::CoreConfig;
pub use error::{StoreError, StoreResult};
pub use records::{
    Appointment, AppointmentStatus, Exam, Patient, Profile, Referral, ReferralStatus, Specialist,
};
pub use roles::Role;
pub use scheduling::CanonicalSlots;
pub use scope::{Action, ActionSet, ScopePolicy};
pub use session::Viewer;
pub use store::{DataStore, MemoryStore};
