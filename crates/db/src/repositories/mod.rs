//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or a connection inside a caller's transaction) as the
//! first argument.

pub mod profile_image_repo;
pub mod profile_repo;
pub mod setting_repo;

pub use profile_image_repo::ProfileImageRepo;
pub use profile_repo::ProfileRepo;
pub use setting_repo::SettingRepo;
