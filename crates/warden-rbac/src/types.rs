//! # Roles and principals
//!
//! Identifier types for the RBAC system. Both are validated on construction
//! so that a role name can be turned into a storage key and a principal into
//! a chat mention without escaping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RbacError, RbacResult};

/// Maximum length of a role name.
pub const MAX_ROLE_NAME_LEN: usize = 64;

/// A validated role name.
///
/// Role names are 1 to 64 ASCII letters, digits or underscores. Separators
/// such as `:` are rejected, so a role name can never reach outside its own
/// storage key.
///
/// # Example
///
/// ```
/// use warden_rbac::types::RoleName;
///
/// let role = RoleName::new("deploy_prod").unwrap();
/// assert_eq!(role.as_str(), "deploy_prod");
///
/// assert!(RoleName::new("admin:evil").is_err());
/// assert!(RoleName::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Name of the statically configured role.
    pub const ROOT: &'static str = "root";

    /// Name of the default administrator role.
    pub const ADMIN: &'static str = "admin";

    /// Create a role name, validating the identifier grammar.
    pub fn new(name: impl Into<String>) -> RbacResult<Self> {
        let name = name.into();

        let valid = !name.is_empty()
            && name.len() <= MAX_ROLE_NAME_LEN
            && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');

        if valid {
            Ok(Self(name))
        } else {
            Err(RbacError::InvalidRoleName(name))
        }
    }

    /// The reserved `root` role.
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    /// The `admin` role.
    pub fn admin() -> Self {
        Self(Self::ADMIN.to_string())
    }

    /// Check if this is the reserved `root` role.
    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }

    /// Get the role name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoleName {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RoleName {
    type Error = RbacError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleName> for String {
    fn from(role: RoleName) -> Self {
        role.0
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The identity of the user attempting an action.
///
/// Principals are opaque ids (e.g. Slack user ids like `U024BE7LH`). They
/// must be non-empty and must not contain whitespace or mention syntax
/// (`<`, `>`, `@`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Create a principal, rejecting ids that cannot be a user id.
    pub fn new(id: impl Into<String>) -> RbacResult<Self> {
        let id = id.into();

        let valid = !id.is_empty()
            && !id
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '@'));

        if valid {
            Ok(Self(id))
        } else {
            Err(RbacError::InvalidPrincipal(id))
        }
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chat mention for this principal, e.g. `<@U024BE7LH>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Principal {
    type Err = RbacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Principal {
    type Error = RbacError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Principal> for String {
    fn from(principal: Principal) -> Self {
        principal.0
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_name_grammar() {
        assert!(RoleName::new("admin").is_ok());
        assert!(RoleName::new("Deploy_2").is_ok());
        assert!(RoleName::new("a".repeat(MAX_ROLE_NAME_LEN)).is_ok());

        assert!(RoleName::new("").is_err());
        assert!(RoleName::new("a".repeat(MAX_ROLE_NAME_LEN + 1)).is_err());
        assert!(RoleName::new("role:admin").is_err());
        assert!(RoleName::new("with space").is_err());
        assert!(RoleName::new("héllo").is_err());
        assert!(RoleName::new("*").is_err());
    }

    #[test]
    fn test_reserved_names() {
        assert!(RoleName::root().is_root());
        assert!(RoleName::new("root").unwrap().is_root());
        assert!(!RoleName::admin().is_root());
        assert_eq!(RoleName::admin().as_str(), "admin");
    }

    #[test]
    fn test_principal_validation() {
        assert!(Principal::new("U024BE7LH").is_ok());

        assert!(Principal::new("").is_err());
        assert!(Principal::new("U1 U2").is_err());
        assert!(Principal::new("<@U1>").is_err());
    }

    #[test]
    fn test_principal_mention() {
        let p = Principal::new("U2").unwrap();
        assert_eq!(p.mention(), "<@U2>");
        assert_eq!(p.to_string(), "U2");
    }

    #[test]
    fn test_serde_validates() {
        let roles: Vec<RoleName> = serde_json::from_str(r#"["admin","ops"]"#).unwrap();
        assert_eq!(roles.len(), 2);

        assert!(serde_json::from_str::<RoleName>(r#""bad:name""#).is_err());
        assert!(serde_json::from_str::<Principal>(r#""""#).is_err());

        let json = serde_json::to_string(&Principal::new("U1").unwrap()).unwrap();
        assert_eq!(json, r#""U1""#);
    }
}
