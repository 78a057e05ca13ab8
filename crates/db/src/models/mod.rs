//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - Query/filter DTOs for the repository methods that need them

pub mod profile;
pub mod profile_image;
pub mod setting;
