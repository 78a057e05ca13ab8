//! Well-known role name constants carried in access-token claims.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_AGENT: &str = "agent";

/// Roles allowed to review, edit and bill profiles.
pub const STAFF_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_AGENT];

pub fn is_staff(role: &str) -> bool {
    STAFF_ROLES.contains(&role)
}
