//! Role administration commands.
//!
//! - `grant role <role> to <@user>`
//! - `revoke role <role> from <@user>`
//! - `who has role <role>`
//!
//! All three require `root` or `admin`.

use async_trait::async_trait;
use std::sync::Arc;
use warden_rbac::{GrantOutcome, Policy, RbacError, RevokeOutcome, RoleName, RoleStore};

use crate::handler::{CommandArgs, CommandDefinition, CommandError, CommandHandler, CommandResult};
use crate::message::{Message, Reply};

/// Pattern of the grant command.
pub const GRANT_PATTERN: &str = r"^grant\s+role\s+(?P<role>\w+)\s+to\s+<@(?P<user>\w+)>$";

/// Pattern of the revoke command.
pub const REVOKE_PATTERN: &str = r"^revoke\s+role\s+(?P<role>\w+)\s+from\s+<@(?P<user>\w+)>$";

/// Pattern of the list command. Trailing text is ignored.
pub const WHO_HAS_PATTERN: &str = r"^who\s+has\s+role\s+(?P<role>\w+)";

/// Reply to a role argument outside the role grammar, `None` otherwise.
fn invalid_role_reply(result: &CommandResult<RoleName>, args: &CommandArgs) -> Option<Reply> {
    match result {
        Err(CommandError::Rbac(RbacError::InvalidRoleName(_))) => Some(Reply::say(format!(
            "Invalid role name: `{}`",
            args.get("role").unwrap_or_default()
        ))),
        _ => None,
    }
}

/// `grant role <role> to <@user>`
pub struct GrantRole {
    store: RoleStore,
}

impl GrantRole {
    /// Create the command over `store`.
    pub fn new(store: RoleStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommandHandler for GrantRole {
    fn definition(&self) -> CommandDefinition {
        CommandDefinition::new("grant_role", GRANT_PATTERN, Policy::root_or_admin())
    }

    async fn execute(&self, _message: &Message, args: &CommandArgs) -> CommandResult<Reply> {
        let role = args.role();
        if let Some(reply) = invalid_role_reply(&role, args) {
            return Ok(reply);
        }
        let role = role?;

        if role.is_root() {
            return Ok(Reply::say(
                "Sorry, role `root` can only be granted via static configuration",
            ));
        }

        let user = args.user()?;
        match self.store.grant(&role, &user).await? {
            GrantOutcome::Granted | GrantOutcome::AlreadyAssigned => Ok(Reply::say(format!(
                "Role `{}` has been granted to {}",
                role,
                user.mention()
            ))),
        }
    }
}

/// `revoke role <role> from <@user>`
pub struct RevokeRole {
    store: RoleStore,
}

impl RevokeRole {
    /// Create the command over `store`.
    pub fn new(store: RoleStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommandHandler for RevokeRole {
    fn definition(&self) -> CommandDefinition {
        CommandDefinition::new("revoke_role", REVOKE_PATTERN, Policy::root_or_admin())
    }

    async fn execute(&self, _message: &Message, args: &CommandArgs) -> CommandResult<Reply> {
        let role = args.role();
        if let Some(reply) = invalid_role_reply(&role, args) {
            return Ok(reply);
        }
        let role = role?;

        if role.is_root() {
            return Ok(Reply::say(
                "Sorry, role `root` can only be revoked via static configuration",
            ));
        }

        let user = args.user()?;
        let text = match self.store.revoke(&role, &user).await? {
            RevokeOutcome::Revoked => {
                format!("Role `{}` has been revoked from {}", role, user.mention())
            }
            RevokeOutcome::NotAssigned => {
                format!("User {} does not have role `{}`", user.mention(), role)
            }
        };
        Ok(Reply::say(text))
    }
}

/// `who has role <role>`
pub struct WhoHasRole {
    store: RoleStore,
}

impl WhoHasRole {
    /// Create the command over `store`.
    pub fn new(store: RoleStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CommandHandler for WhoHasRole {
    fn definition(&self) -> CommandDefinition {
        CommandDefinition::new("who_has_role", WHO_HAS_PATTERN, Policy::root_or_admin())
    }

    async fn execute(&self, _message: &Message, args: &CommandArgs) -> CommandResult<Reply> {
        let role = args.role();
        if let Some(reply) = invalid_role_reply(&role, args) {
            return Ok(reply);
        }
        let role = role?;

        let members = self.store.members(&role).await?;
        if members.is_empty() {
            return Ok(Reply::say(format!("No one has been assigned role `{}`", role)));
        }

        let mentions: Vec<String> = members.iter().map(|p| p.mention()).collect();
        Ok(Reply::say(format!(
            "Role `{}` has been granted to {}",
            role,
            mentions.join(", ")
        )))
    }
}

/// The three role administration commands over one store.
pub fn rbac_commands(store: &RoleStore) -> Vec<Arc<dyn CommandHandler>> {
    vec![
        Arc::new(GrantRole::new(store.clone())),
        Arc::new(RevokeRole::new(store.clone())),
        Arc::new(WhoHasRole::new(store.clone())),
    ]
}
