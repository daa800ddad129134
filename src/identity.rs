// src/identity.rs

use serde::Serialize;

use crate::models::user::Role;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Stable user id, recorded as `student_id` / `created_by`.
    pub id: String,
    pub role: Role,
}

/// Anything that can vouch for the current caller.
pub trait IdentityProvider {
    fn principal(&self) -> Principal;
}
