//! Authorization decisions for simulation access.
//!
//! Pure functions over an optional [`AccessGrant`] — no storage, no
//! transport. The repository fetches the grant (resource existence, the
//! caller's global role, and their membership role if any) in a single
//! query; this module only decides.

/// The caller's standing on an existing simulation: their platform-wide
/// role plus their membership role when a membership row exists. Fetched in
/// one query by [`crate::db::handlers::Simulations::find_grant`]; absent
/// entirely when the simulation does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub global_role: String,
    pub membership_role: Option<String>,
}

/// Three-way authorization outcome.
///
/// `NotFound` covers both a missing resource and a resource the caller has
/// no membership on, so non-members cannot probe for existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    NotFound,
    Forbidden,
}

/// Role comparisons are case-insensitive throughout.
pub fn is_admin_role(role: &str) -> bool {
    role.eq_ignore_ascii_case("admin")
}

/// A membership row is what makes a simulation visible.
pub fn can_view(grant: Option<&AccessGrant>) -> bool {
    grant.is_some_and(|g| g.membership_role.is_some())
}

/// Delete requires the "admin" membership role on the simulation, or the
/// "admin" global role — the latter overrides a missing or low membership.
pub fn can_delete(grant: Option<&AccessGrant>) -> Decision {
    match grant {
        None => Decision::NotFound,
        Some(g) if is_admin_role(&g.global_role) => Decision::Allow,
        Some(g) => match g.membership_role.as_deref() {
            Some(role) if is_admin_role(role) => Decision::Allow,
            Some(_) => Decision::Forbidden,
            None => Decision::NotFound,
        },
    }
}
