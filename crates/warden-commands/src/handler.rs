//! Command handler contract.
//!
//! A handler declares the text pattern it answers to and the role policy
//! guarding it. The router matches the pattern, checks the policy, and only
//! then calls [`CommandHandler::execute`].

use async_trait::async_trait;
use regex::Captures;
use std::collections::HashMap;
use thiserror::Error;
use warden_rbac::{Policy, Principal, RbacError, RoleName};

use crate::message::{Message, Reply};

/// Command error types.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Pattern matched but a named argument is absent
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    /// Authorization or role store failure
    #[error(transparent)]
    Rbac(#[from] RbacError),
}

/// Result type for command execution.
pub type CommandResult<T> = Result<T, CommandError>;

/// Static description of a command.
#[derive(Debug, Clone)]
pub struct CommandDefinition {
    /// Unique command name
    pub name: String,
    /// Regex matched against the whole message text
    pub pattern: String,
    /// Roles required to run the command
    pub policy: Policy,
}

impl CommandDefinition {
    /// Create a definition guarded by `policy`.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, policy: Policy) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            policy,
        }
    }
}

/// Named captures of a matched command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    values: HashMap<String, String>,
}

impl CommandArgs {
    /// Collect the named groups of `captures`.
    pub fn from_captures(regex: &regex::Regex, captures: &Captures<'_>) -> Self {
        let values = regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();
        Self { values }
    }

    /// Build arguments from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a required argument.
    pub fn get(&self, name: &str) -> CommandResult<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| CommandError::MissingArgument(name.to_string()))
    }

    /// Get the `role` argument as a role name.
    pub fn role(&self) -> CommandResult<RoleName> {
        Ok(RoleName::new(self.get("role")?)?)
    }

    /// Get the `user` argument as a principal.
    pub fn user(&self) -> CommandResult<Principal> {
        Ok(Principal::new(self.get("user")?)?)
    }
}

/// Trait for command implementations.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Get the command definition.
    fn definition(&self) -> CommandDefinition;

    /// Execute the command. Only called once the policy is satisfied.
    async fn execute(&self, message: &Message, args: &CommandArgs) -> CommandResult<Reply>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_args_from_captures() {
        let regex = Regex::new(r"^grant\s+role\s+(?P<role>\w+)\s+to\s+<@(?P<user>\w+)>$").unwrap();
        let captures = regex.captures("grant role ops to <@U2>").unwrap();
        let args = CommandArgs::from_captures(&regex, &captures);

        assert_eq!(args.get("role").unwrap(), "ops");
        assert_eq!(args.user().unwrap().as_str(), "U2");
        assert_eq!(args.role().unwrap().as_str(), "ops");
    }

    #[test]
    fn test_missing_argument() {
        let args = CommandArgs::from_pairs([("role", "ops")]);
        assert!(matches!(args.user(), Err(CommandError::MissingArgument(ref n)) if n == "user"));
    }

    #[test]
    fn test_invalid_role_argument() {
        let args = CommandArgs::from_pairs([("role", "x".repeat(65))]);
        assert!(matches!(
            args.role(),
            Err(CommandError::Rbac(RbacError::InvalidRoleName(_)))
        ));
    }
}
