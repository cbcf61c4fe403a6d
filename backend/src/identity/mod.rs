use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use thiserror::Error;
use uuid::Uuid;

/// Access role of an account. Carried as reference data only;
/// authorization is enforced outside this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Manager,
    Operator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Operator => "OPERATOR",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "OPERATOR" => Ok(Role::Operator),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// The acting account attached to movements and failed attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// `None` for the synthetic system identity, which has no account row.
    pub id: Option<Uuid>,
    pub username: String,
    pub role: Role,
}

/// Fallback identity used when no caller identity can be resolved.
pub fn system_user() -> User {
    User {
        id: None,
        username: "system".to_string(),
        role: Role::Operator,
    }
}

/// Source of the ambient caller identity for a submission.
///
/// Implementations sit at the transport boundary (request context, service
/// account); the engine only reads, never enforces.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Result<User>;
}

/// Fixed identity; the common case for service-to-service callers and tests.
pub struct StaticIdentity(pub User);

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Result<User> {
        Ok(self.0.clone())
    }
}
