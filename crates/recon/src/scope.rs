use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScopeError;
use crate::model::UserId;

/// Canonical role set. No aliases are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Operator,
    Manager,
    Admin,
}

impl Role {
    /// Whether this role may read another user's records.
    pub fn can_read_others(self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Operator => "operator",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "operator" => Ok(Role::Operator),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => Err(ScopeError::UnknownRole(other.to_string())),
        }
    }
}

/// The authenticated identity making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user: UserId,
    pub role: Role,
}

/// Whose records a read targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Own,
    User(UserId),
}

/// Resolve `scope` to the user id to query, checked against the caller's role.
pub fn authorize(caller: &Caller, scope: &Scope) -> Result<UserId, ScopeError> {
    match scope {
        Scope::Own => Ok(caller.user.clone()),
        Scope::User(target) if *target == caller.user => Ok(target.clone()),
        Scope::User(target) if caller.role.can_read_others() => Ok(target.clone()),
        Scope::User(target) => Err(ScopeError::Forbidden {
            role: caller.role.to_string(),
            target: target.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role) -> Caller {
        Caller { user: UserId::new("ana"), role }
    }

    #[test]
    fn own_scope_always_allowed() {
        for role in [Role::Operator, Role::Manager, Role::Admin] {
            assert_eq!(authorize(&caller(role), &Scope::Own).unwrap(), UserId::new("ana"));
        }
    }

    #[test]
    fn operator_cannot_read_others() {
        let err = authorize(&caller(Role::Operator), &Scope::User(UserId::new("rui")));
        assert!(matches!(err, Err(ScopeError::Forbidden { .. })));
        let same = authorize(&caller(Role::Operator), &Scope::User(UserId::new("ana")));
        assert_eq!(same.unwrap(), UserId::new("ana"));
    }

    #[test]
    fn elevated_roles_read_target() {
        for role in [Role::Manager, Role::Admin] {
            let id = authorize(&caller(role), &Scope::User(UserId::new("rui"))).unwrap();
            assert_eq!(id, UserId::new("rui"));
        }
    }

    #[test]
    fn legacy_role_spellings_are_rejected() {
        for s in ["gestor", "administrador", "Admin"] {
            assert!(matches!(s.parse::<Role>(), Err(ScopeError::UnknownRole(_))));
        }
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
    }
}
