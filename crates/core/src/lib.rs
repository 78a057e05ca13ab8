//! Domain logic for the biodata registry.
//!
//! Pure functions and types with no I/O: the field whitelist, value
//! normalization, statement builders for partial updates and registrations,
//! the expiry rule, and settings validation. The `biodata-db` crate executes
//! what this crate plans.

pub mod error;
pub mod expiry;
pub mod normalize;
pub mod pagination;
pub mod plan;
pub mod profile_fields;
pub mod profile_status;
pub mod registration;
pub mod roles;
pub mod settings;
pub mod types;
pub mod update_plan;
